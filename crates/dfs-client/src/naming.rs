// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Clients for the naming service and registration ports

use std::time::Duration;

use dfs_api_contract::*;

use crate::error::ClientResult;
use crate::transport::HttpTransport;

/// Client for the naming service port
#[derive(Debug, Clone)]
pub struct NamingClient {
    transport: HttpTransport,
}

impl NamingClient {
    /// No request timeout: `lock` blocks until the lock is granted.
    pub fn from_url(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            transport: HttpTransport::from_url(base_url, None)?,
        })
    }

    pub fn with_transport(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub fn base_url(&self) -> &url::Url {
        self.transport.base_url()
    }

    /// Validity check for a raw path string; never fails remotely
    pub async fn is_valid_path(&self, path: &str) -> ClientResult<bool> {
        let body = PathRequest {
            path: path.to_string(),
        };
        let response: SuccessResponse = self.transport.post("/is_valid_path", &body).await?;
        Ok(response.success)
    }

    pub async fn get_storage(&self, path: &Path) -> ClientResult<ServerInfo> {
        self.transport.post("/getstorage", &PathRequest::new(path)).await
    }

    pub async fn delete(&self, path: &Path) -> ClientResult<bool> {
        self.post_path("/delete", path).await
    }

    pub async fn create_directory(&self, path: &Path) -> ClientResult<bool> {
        self.post_path("/create_directory", path).await
    }

    pub async fn create_file(&self, path: &Path) -> ClientResult<bool> {
        self.post_path("/create_file", path).await
    }

    pub async fn list(&self, path: &Path) -> ClientResult<Vec<String>> {
        let response: FilesResponse = self.transport.post("/list", &PathRequest::new(path)).await?;
        Ok(response.files)
    }

    pub async fn is_directory(&self, path: &Path) -> ClientResult<bool> {
        self.post_path("/is_directory", path).await
    }

    pub async fn lock(&self, path: &Path, exclusive: bool) -> ClientResult<()> {
        let _: Ack = self.transport.post("/lock", &LockRequest::new(path, exclusive)).await?;
        Ok(())
    }

    pub async fn unlock(&self, path: &Path, exclusive: bool) -> ClientResult<()> {
        let _: Ack = self.transport.post("/unlock", &LockRequest::new(path, exclusive)).await?;
        Ok(())
    }

    async fn post_path(&self, route: &str, path: &Path) -> ClientResult<bool> {
        let response: SuccessResponse = self.transport.post(route, &PathRequest::new(path)).await?;
        Ok(response.success)
    }
}

/// Client for the naming service's registration port
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    transport: HttpTransport,
}

impl RegistrationClient {
    pub fn from_url(base_url: &str, timeout: Option<Duration>) -> ClientResult<Self> {
        Ok(Self {
            transport: HttpTransport::from_url(base_url, timeout)?,
        })
    }

    /// Register a storage node; returns the paths it must delete locally.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<Vec<String>> {
        let response: FilesResponse = self.transport.post("/register", request).await?;
        Ok(response.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_client_keeps_base_url() {
        let client = NamingClient::from_url("http://localhost:8080").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn registration_client_rejects_bad_url() {
        assert!(RegistrationClient::from_url("localhost 8090", None).is_err());
    }
}
