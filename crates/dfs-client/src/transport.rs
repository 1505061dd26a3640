// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! JSON-over-HTTP request plumbing shared by all clients

use std::time::Duration;

use dfs_api_contract::ErrorResponse;
use reqwest::{Client as HttpClient, Response};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// A base URL plus a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: HttpClient,
    base_url: Url,
}

impl HttpTransport {
    /// `timeout` bounds each whole request; `None` waits indefinitely, which
    /// is what a blocking `Lock` call needs.
    pub fn new(base_url: Url, timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = HttpClient::builder().user_agent(concat!("dfs/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http_client: builder.build()?,
            base_url,
        })
    }

    pub fn from_url(base_url: &str, timeout: Option<Duration>) -> ClientResult<Self> {
        Self::new(Url::parse(base_url)?, timeout)
    }

    /// `http://<ip>:<port>/`
    pub fn for_host(ip: &str, port: u16, timeout: Option<Duration>) -> ClientResult<Self> {
        Self::from_url(&format!("http://{}:{}/", ip, port), timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        route: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = self.base_url.join(route)?;
        tracing::trace!(%url, "POST");
        let response = self.http_client.post(url).json(body).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(ClientError::from);
        }

        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(error) => Err(ClientError::Remote {
                status: status.as_u16(),
                kind: error.exception_type,
                message: error.exception_info,
            }),
            Err(_) => Err(ClientError::UnexpectedResponse {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_urls_are_normalized() {
        let transport = HttpTransport::for_host("127.0.0.1", 7000, None).unwrap();
        assert_eq!(transport.base_url().as_str(), "http://127.0.0.1:7000/");
        assert_eq!(
            transport.base_url().join("/storage_size").unwrap().as_str(),
            "http://127.0.0.1:7000/storage_size"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            HttpTransport::from_url("not a url", None),
            Err(ClientError::Url(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport =
            HttpTransport::for_host("127.0.0.1", port, Some(Duration::from_secs(2))).unwrap();
        let result: ClientResult<serde_json::Value> =
            transport.post("/storage_size", &serde_json::json!({"path": "/x"})).await;
        let err = result.unwrap_err();
        assert!(err.is_transport(), "got {err:?}");
    }
}
