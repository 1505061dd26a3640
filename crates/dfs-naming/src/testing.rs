// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory storage fleet for exercising the naming service without
//! running storage nodes

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dfs_api_contract::{ErrorKind, Path};
use dfs_client::{ClientError, ClientResult};

use crate::commands::StorageCommands;
use crate::registry::StorageNodeId;

/// A command the fleet received, in arrival order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FleetCall {
    Create(StorageNodeId, Path),
    Delete(StorageNodeId, Path),
    Copy {
        node: StorageNodeId,
        path: Path,
        source: StorageNodeId,
    },
}

#[derive(Debug, Default)]
struct FleetInner {
    files: HashMap<StorageNodeId, BTreeMap<Path, Vec<u8>>>,
    unreachable: HashSet<StorageNodeId>,
    stall_copies: bool,
    calls: Vec<FleetCall>,
}

/// Fake [`StorageCommands`] backed by per-node file maps
#[derive(Debug, Default)]
pub struct FakeFleet {
    inner: Mutex<FleetInner>,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, FleetInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place a file on `node` directly
    pub fn put(&self, node: &StorageNodeId, path: &Path, data: &[u8]) {
        self.inner()
            .files
            .entry(node.clone())
            .or_default()
            .insert(path.clone(), data.to_vec());
    }

    pub fn get(&self, node: &StorageNodeId, path: &Path) -> Option<Vec<u8>> {
        self.inner().files.get(node)?.get(path).cloned()
    }

    pub fn files_on(&self, node: &StorageNodeId) -> Vec<Path> {
        self.inner()
            .files
            .get(node)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every command to `node` fail with an I/O error
    pub fn set_unreachable(&self, node: &StorageNodeId, unreachable: bool) {
        let mut inner = self.inner();
        if unreachable {
            inner.unreachable.insert(node.clone());
        } else {
            inner.unreachable.remove(node);
        }
    }

    /// Make copy commands hang until the caller gives up
    pub fn set_stall_copies(&self, stall: bool) {
        self.inner().stall_copies = stall;
    }

    pub fn calls(&self) -> Vec<FleetCall> {
        self.inner().calls.clone()
    }

    fn begin(&self, call: FleetCall, node: &StorageNodeId) -> ClientResult<MutexGuard<'_, FleetInner>> {
        let mut inner = self.inner();
        inner.calls.push(call);
        if inner.unreachable.contains(node) {
            return Err(remote(ErrorKind::IoFailure, format!("{} is unreachable", node)));
        }
        Ok(inner)
    }
}

fn remote(kind: ErrorKind, message: String) -> ClientError {
    ClientError::Remote {
        status: kind.status_code(),
        kind,
        message,
    }
}

#[async_trait]
impl StorageCommands for FakeFleet {
    async fn create(&self, node: &StorageNodeId, path: &Path) -> ClientResult<bool> {
        let mut inner = self.begin(FleetCall::Create(node.clone(), path.clone()), node)?;
        let files = inner.files.entry(node.clone()).or_default();
        if path.is_root() || files.contains_key(path) {
            return Ok(false);
        }
        files.insert(path.clone(), Vec::new());
        Ok(true)
    }

    async fn delete(&self, node: &StorageNodeId, path: &Path) -> ClientResult<bool> {
        let mut inner = self.begin(FleetCall::Delete(node.clone(), path.clone()), node)?;
        let Some(files) = inner.files.get_mut(node) else {
            return Ok(false);
        };
        let before = files.len();
        files.retain(|file, _| !file.is_subpath_of(path));
        Ok(files.len() < before)
    }

    async fn copy(
        &self,
        node: &StorageNodeId,
        path: &Path,
        source: &StorageNodeId,
    ) -> ClientResult<bool> {
        let call = FleetCall::Copy {
            node: node.clone(),
            path: path.clone(),
            source: source.clone(),
        };
        let stalled = self.inner().stall_copies;
        if stalled {
            std::future::pending::<()>().await;
        }
        let mut inner = self.begin(call, node)?;
        if inner.unreachable.contains(source) {
            return Err(remote(ErrorKind::IoFailure, format!("{} is unreachable", source)));
        }
        let data = inner
            .files
            .get(source)
            .and_then(|files| files.get(path))
            .cloned()
            .ok_or_else(|| remote(ErrorKind::FileNotFound, format!("{} does not exist", path)))?;
        inner
            .files
            .entry(node.clone())
            .or_default()
            .insert(path.clone(), data);
        Ok(true)
    }
}
