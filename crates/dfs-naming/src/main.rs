// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Naming service binary

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use dfs_logging::CliLoggingArgs;
use dfs_naming::{NamingConfig, NamingServer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "DFS_NAMING_CONFIG")]
    config: Option<PathBuf>,

    /// Address for client-facing naming operations
    #[arg(long, env = "DFS_NAMING_SERVICE_ADDR")]
    service_addr: Option<SocketAddr>,

    /// Address storage nodes register on
    #[arg(long, env = "DFS_NAMING_REGISTRATION_ADDR")]
    registration_addr: Option<SocketAddr>,

    /// Shared grants on a file between replications
    #[arg(long, env = "DFS_NAMING_REPLICATION_THRESHOLD")]
    replication_threshold: Option<u64>,

    /// Timeout in seconds for commands sent to storage nodes (0 disables)
    #[arg(long, env = "DFS_NAMING_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(NamingConfig, CliLoggingArgs)> {
        let mut config = match &self.config {
            Some(path) => NamingConfig::load(path)?,
            None => NamingConfig::default(),
        };
        if let Some(addr) = self.service_addr {
            config.service_addr = addr;
        }
        if let Some(addr) = self.registration_addr {
            config.registration_addr = addr;
        }
        if let Some(threshold) = self.replication_threshold {
            config.replication_threshold = threshold;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        Ok((config, self.logging))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, logging) = Args::parse().into_config()?;
    logging.init("dfs-naming")?;

    tracing::info!(
        service = %config.service_addr,
        registration = %config.registration_addr,
        threshold = config.replication_threshold,
        "starting naming service"
    );

    NamingServer::new(config).run().await?;
    Ok(())
}
