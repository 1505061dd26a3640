// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Clients for a storage node's client and command ports

use std::time::Duration;

use dfs_api_contract::*;

use crate::error::ClientResult;
use crate::transport::HttpTransport;

/// Data I/O against a storage node's client port
#[derive(Debug, Clone)]
pub struct StorageClient {
    transport: HttpTransport,
}

impl StorageClient {
    pub fn new(ip: &str, client_port: u16, timeout: Option<Duration>) -> ClientResult<Self> {
        Ok(Self {
            transport: HttpTransport::for_host(ip, client_port, timeout)?,
        })
    }

    pub fn for_server(server: &ServerInfo, timeout: Option<Duration>) -> ClientResult<Self> {
        Self::new(&server.server_ip, server.server_port, timeout)
    }

    pub async fn size(&self, path: &Path) -> ClientResult<u64> {
        let response: SizeResponse =
            self.transport.post("/storage_size", &PathRequest::new(path)).await?;
        Ok(response.size)
    }

    pub async fn read(&self, path: &Path, offset: i64, length: i64) -> ClientResult<Vec<u8>> {
        let response: DataResponse = self
            .transport
            .post("/storage_read", &ReadRequest::new(path, offset, length))
            .await?;
        Ok(response.decode()?)
    }

    pub async fn write(&self, path: &Path, offset: i64, data: &[u8]) -> ClientResult<bool> {
        let response: SuccessResponse = self
            .transport
            .post("/storage_write", &WriteRequest::new(path, offset, data))
            .await?;
        Ok(response.success)
    }
}

/// Structural commands against a storage node's command port
#[derive(Debug, Clone)]
pub struct CommandClient {
    transport: HttpTransport,
}

impl CommandClient {
    pub fn new(ip: &str, command_port: u16, timeout: Option<Duration>) -> ClientResult<Self> {
        Ok(Self {
            transport: HttpTransport::for_host(ip, command_port, timeout)?,
        })
    }

    pub async fn create(&self, path: &Path) -> ClientResult<bool> {
        let response: SuccessResponse =
            self.transport.post("/storage_create", &PathRequest::new(path)).await?;
        Ok(response.success)
    }

    pub async fn delete(&self, path: &Path) -> ClientResult<bool> {
        let response: SuccessResponse =
            self.transport.post("/storage_delete", &PathRequest::new(path)).await?;
        Ok(response.success)
    }

    /// Have this node pull `path` from the node whose client port is
    /// `server_ip:server_port`.
    pub async fn copy(&self, path: &Path, server_ip: &str, server_port: u16) -> ClientResult<bool> {
        let response: SuccessResponse = self
            .transport
            .post("/storage_copy", &CopyRequest::new(path, server_ip, server_port))
            .await?;
        Ok(response.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_client_from_server_info() {
        let server = ServerInfo {
            server_ip: "127.0.0.1".into(),
            server_port: 7000,
        };
        assert!(StorageClient::for_server(&server, None).is_ok());
    }

    #[test]
    fn command_client_builds_for_loopback() {
        assert!(CommandClient::new("127.0.0.1", 7001, Some(Duration::from_secs(5))).is_ok());
    }
}
