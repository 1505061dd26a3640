// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Commands the naming service sends to storage nodes

use std::time::Duration;

use async_trait::async_trait;
use dfs_api_contract::Path;
use dfs_client::{ClientResult, CommandClient};

use crate::registry::StorageNodeId;

/// Structural commands against a storage node's command port
#[async_trait]
pub trait StorageCommands: Send + Sync {
    /// Create an empty file on `node`
    async fn create(&self, node: &StorageNodeId, path: &Path) -> ClientResult<bool>;

    /// Delete a file or directory tree on `node`
    async fn delete(&self, node: &StorageNodeId, path: &Path) -> ClientResult<bool>;

    /// Have `node` pull `path` from `source`
    async fn copy(
        &self,
        node: &StorageNodeId,
        path: &Path,
        source: &StorageNodeId,
    ) -> ClientResult<bool>;
}

/// [`StorageCommands`] over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpStorageCommands {
    timeout: Option<Duration>,
}

impl HttpStorageCommands {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn client(&self, node: &StorageNodeId) -> ClientResult<CommandClient> {
        CommandClient::new(&node.ip, node.command_port, self.timeout)
    }
}

#[async_trait]
impl StorageCommands for HttpStorageCommands {
    async fn create(&self, node: &StorageNodeId, path: &Path) -> ClientResult<bool> {
        self.client(node)?.create(path).await
    }

    async fn delete(&self, node: &StorageNodeId, path: &Path) -> ClientResult<bool> {
        self.client(node)?.delete(path).await
    }

    async fn copy(
        &self,
        node: &StorageNodeId,
        path: &Path,
        source: &StorageNodeId,
    ) -> ClientResult<bool> {
        self.client(node)?
            .copy(path, &source.ip, source.client_port)
            .await
    }
}
