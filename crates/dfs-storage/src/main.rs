// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage node binary

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use dfs_logging::CliLoggingArgs;
use dfs_storage::{StorageConfig, StorageNode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "DFS_STORAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address for client data I/O
    #[arg(long, env = "DFS_STORAGE_CLIENT_ADDR")]
    client_addr: Option<SocketAddr>,

    /// Address for commands from the naming service
    #[arg(long, env = "DFS_STORAGE_COMMAND_ADDR")]
    command_addr: Option<SocketAddr>,

    /// IP advertised to the naming service
    #[arg(long, env = "DFS_STORAGE_ADVERTISE_IP")]
    advertise_ip: Option<String>,

    /// Naming service registration URL, e.g. http://127.0.0.1:8090
    #[arg(long, env = "DFS_STORAGE_NAMING_URL")]
    naming_url: Option<String>,

    /// Directory holding this node's files
    #[arg(long, env = "DFS_STORAGE_ROOT")]
    root_dir: Option<PathBuf>,

    /// Tries per copy step on transport failure
    #[arg(long, env = "DFS_STORAGE_COPY_ATTEMPTS")]
    copy_attempts: Option<u32>,

    /// Timeout in seconds for outgoing requests (0 disables)
    #[arg(long, env = "DFS_STORAGE_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(StorageConfig, CliLoggingArgs)> {
        let mut config = match &self.config {
            Some(path) => StorageConfig::load(path)?,
            None => StorageConfig::default(),
        };
        if let Some(addr) = self.client_addr {
            config.client_addr = addr;
        }
        if let Some(addr) = self.command_addr {
            config.command_addr = addr;
        }
        if let Some(ip) = self.advertise_ip {
            config.advertise_ip = ip;
        }
        if let Some(url) = self.naming_url {
            config.naming_registration_url = url;
        }
        if let Some(root) = self.root_dir {
            config.root_dir = root;
        }
        if let Some(attempts) = self.copy_attempts {
            config.copy_attempts = attempts;
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
    logging.init("dfs-storage")?;

    tracing::info!(
        client = %config.client_addr,
        command = %config.command_addr,
        naming = %config.naming_registration_url,
        "starting storage node"
    );

    StorageNode::new(config).await?.run().await?;
    Ok(())
}
