// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage node configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Storage node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Address for client data I/O
    pub client_addr: SocketAddr,

    /// Address for commands from the naming service
    pub command_addr: SocketAddr,

    /// IP the naming service and peers should use to reach this node
    pub advertise_ip: String,

    /// Base URL of the naming service's registration port
    pub naming_registration_url: String,

    /// Directory holding this node's files
    pub root_dir: PathBuf,

    /// Tries per copy step on transport failure
    pub copy_attempts: u32,

    /// Timeout for outgoing requests; 0 disables it
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            client_addr: SocketAddr::from(([127, 0, 0, 1], 7000)),
            command_addr: SocketAddr::from(([127, 0, 0, 1], 7001)),
            advertise_ip: "127.0.0.1".to_string(),
            naming_registration_url: "http://127.0.0.1:8090".to_string(),
            root_dir: default_root_dir(),
            copy_attempts: 3,
            request_timeout_secs: 30,
        }
    }
}

/// `<data dir>/dfs/storage`, falling back to the system temp directory
pub fn default_root_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("dfs")
        .join("storage")
}

impl StorageConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid storage node configuration")
    }

    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
