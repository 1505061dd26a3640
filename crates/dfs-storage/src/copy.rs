// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Pulling a file from a peer storage node
//!
//! A copy is three steps run strictly in order: ask the source for the
//! file's size, read `[0, size)` from it, then create the local file if
//! needed and write the bytes at offset 0. The first failing step ends the
//! copy and its error kind is what the caller sees.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dfs_api_contract::Path;
use dfs_client::{ClientResult, StorageClient};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::local::LocalStore;

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CopyPipeline {
    store: Arc<LocalStore>,
    /// Tries per remote step; only transport failures are retried
    attempts: u32,
    timeout: Option<Duration>,
}

impl CopyPipeline {
    pub fn new(store: Arc<LocalStore>, attempts: u32, timeout: Option<Duration>) -> Self {
        Self {
            store,
            attempts: attempts.max(1),
            timeout,
        }
    }

    /// Replace the local copy of `path` with the one on the node whose
    /// client port is `source_ip:source_port`.
    pub async fn copy(&self, path: &Path, source_ip: &str, source_port: u16) -> StorageResult<bool> {
        let source = StorageClient::new(source_ip, source_port, self.timeout)?;

        let size = self.remote_step("size", || source.size(path)).await?;
        let length = i64::try_from(size).map_err(|_| {
            StorageError::IndexOutOfBounds(format!("{} is too large to copy ({} bytes)", path, size))
        })?;
        let data = self
            .remote_step("read", || source.read(path, 0, length))
            .await?;

        if !self.store.is_file(path).await && !self.store.create(path).await? {
            warn!(%path, "cannot create local file for copy");
            return Ok(false);
        }
        self.store.write(path, 0, &data).await?;

        debug!(%path, source = %format!("{source_ip}:{source_port}"), bytes = data.len(), "copied file");
        Ok(true)
    }

    async fn remote_step<T, F, Fut>(&self, step: &str, mut op: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transport() && attempt < self.attempts => {
                    warn!(step, attempt, error = %err, "copy step failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
