// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Registered storage nodes and placement

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use dfs_api_contract::{Path, RegisterRequest, ServerInfo};
use serde::{Deserialize, Serialize};

use crate::error::{NamingError, NamingResult};

/// Identity of a storage node: its IP plus both listening ports
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageNodeId {
    pub ip: String,
    pub client_port: u16,
    pub command_port: u16,
}

impl StorageNodeId {
    pub fn new(ip: impl Into<String>, client_port: u16, command_port: u16) -> Self {
        Self {
            ip: ip.into(),
            client_port,
            command_port,
        }
    }

    /// Address handed to clients for data I/O
    pub fn client_info(&self) -> ServerInfo {
        ServerInfo {
            server_ip: self.ip.clone(),
            server_port: self.client_port,
        }
    }
}

impl fmt::Display for StorageNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.ip, self.client_port, self.command_port)
    }
}

impl From<&RegisterRequest> for StorageNodeId {
    fn from(request: &RegisterRequest) -> Self {
        Self::new(
            request.storage_ip.clone(),
            request.client_port,
            request.command_port,
        )
    }
}

pub type HostSet = BTreeSet<StorageNodeId>;

/// A registered node and the files the naming service believes it holds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageNodeRecord {
    pub id: StorageNodeId,
    pub files: BTreeSet<Path>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    records: Vec<StorageNodeRecord>,
    cursor: usize,
}

/// Set of storage nodes, in registration order
#[derive(Debug, Default)]
pub struct StorageRegistry {
    inner: Mutex<RegistryInner>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a node; a node may only register once.
    pub fn add(&self, id: StorageNodeId) -> NamingResult<()> {
        let mut inner = self.inner();
        if inner.records.iter().any(|record| record.id == id) {
            return Err(NamingError::IllegalState(format!(
                "storage node {} is already registered",
                id
            )));
        }
        inner.records.push(StorageNodeRecord {
            id,
            files: BTreeSet::new(),
        });
        Ok(())
    }

    pub fn contains(&self, id: &StorageNodeId) -> bool {
        self.inner().records.iter().any(|record| &record.id == id)
    }

    pub fn len(&self) -> usize {
        self.inner().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().records.is_empty()
    }

    pub fn record(&self, id: &StorageNodeId) -> Option<StorageNodeRecord> {
        self.inner().records.iter().find(|record| &record.id == id).cloned()
    }

    /// Round-robin choice among registered nodes not in `excluding`.
    ///
    /// Fails with `IllegalState` when nothing is registered or every node
    /// is excluded.
    pub fn select_node(&self, excluding: &HostSet) -> NamingResult<StorageNodeId> {
        let mut inner = self.inner();
        let count = inner.records.len();
        if count == 0 {
            return Err(NamingError::IllegalState(
                "no storage nodes are registered".into(),
            ));
        }

        for offset in 0..count {
            let index = (inner.cursor + offset) % count;
            if !excluding.contains(&inner.records[index].id) {
                inner.cursor = (index + 1) % count;
                return Ok(inner.records[index].id.clone());
            }
        }
        Err(NamingError::IllegalState(
            "every registered storage node is excluded".into(),
        ))
    }

    pub fn note_hosting(&self, id: &StorageNodeId, path: &Path) {
        if let Some(record) = self.inner().records.iter_mut().find(|r| &r.id == id) {
            record.files.insert(path.clone());
        }
    }

    /// Forget `path` and everything below it on node `id`
    pub fn note_removed(&self, id: &StorageNodeId, path: &Path) {
        if let Some(record) = self.inner().records.iter_mut().find(|r| &r.id == id) {
            record.files.retain(|file| !file.is_subpath_of(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(port: u16) -> StorageNodeId {
        StorageNodeId::new("127.0.0.1", port, port + 1)
    }

    #[test]
    fn duplicate_registration_is_illegal_state() {
        let registry = StorageRegistry::new();
        registry.add(node(7000)).unwrap();
        let err = registry.add(node(7000)).unwrap_err();
        assert!(matches!(err, NamingError::IllegalState(_)));
        assert_eq!(registry.len(), 1);

        // Same IP, different ports is a different node
        registry.add(node(7010)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn select_node_round_robins() {
        let registry = StorageRegistry::new();
        for port in [7000, 7010, 7020] {
            registry.add(node(port)).unwrap();
        }
        let picks: Vec<u16> = (0..4)
            .map(|_| registry.select_node(&HostSet::new()).unwrap().client_port)
            .collect();
        assert_eq!(picks, vec![7000, 7010, 7020, 7000]);
    }

    #[test]
    fn select_node_skips_excluded() {
        let registry = StorageRegistry::new();
        registry.add(node(7000)).unwrap();
        registry.add(node(7010)).unwrap();

        let excluding = HostSet::from([node(7000)]);
        for _ in 0..3 {
            assert_eq!(registry.select_node(&excluding).unwrap(), node(7010));
        }

        let everything = HostSet::from([node(7000), node(7010)]);
        assert!(matches!(
            registry.select_node(&everything),
            Err(NamingError::IllegalState(_))
        ));
    }

    #[test]
    fn empty_registry_cannot_place() {
        let registry = StorageRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.select_node(&HostSet::new()),
            Err(NamingError::IllegalState(_))
        ));
    }

    #[test]
    fn file_bookkeeping_follows_subtrees() {
        let registry = StorageRegistry::new();
        let id = node(7000);
        registry.add(id.clone()).unwrap();
        for raw in ["/a/x", "/a/y", "/b"] {
            registry.note_hosting(&id, &Path::parse(raw).unwrap());
        }
        registry.note_removed(&id, &Path::parse("/a").unwrap());

        let files: Vec<String> = registry
            .record(&id)
            .unwrap()
            .files
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(files, vec!["/b".to_string()]);
    }

    #[test]
    fn node_id_display_and_client_info() {
        let id = node(7000);
        assert_eq!(id.to_string(), "127.0.0.1:7000/7001");
        assert_eq!(id.client_info().server_port, 7000);
    }
}
