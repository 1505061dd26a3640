// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Naming service configuration

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::service::DEFAULT_REPLICATION_THRESHOLD;

/// Naming service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Address for client-facing naming operations
    pub service_addr: SocketAddr,

    /// Address storage nodes register on
    pub registration_addr: SocketAddr,

    /// Shared grants on a file between replications
    pub replication_threshold: u64,

    /// Timeout for commands sent to storage nodes; 0 disables it
    pub request_timeout_secs: u64,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            service_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            registration_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
            replication_threshold: DEFAULT_REPLICATION_THRESHOLD,
            request_timeout_secs: 30,
        }
    }
}

impl NamingConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid naming service configuration")
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
