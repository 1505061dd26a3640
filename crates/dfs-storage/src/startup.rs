// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Registration with the naming service at startup

use dfs_api_contract::{Path, RegisterRequest};
use dfs_client::RegistrationClient;
use tracing::{info, warn};

use crate::error::StorageResult;
use crate::local::LocalStore;

/// What registration did to the local root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Files reported to the naming service
    pub reported: Vec<Path>,
    /// Files the naming service already knew about, now deleted locally
    pub deleted: Vec<Path>,
}

/// Report every local file to the naming service, then delete the ones it
/// names as duplicates and prune directories they leave empty.
pub async fn register_and_deduplicate(
    store: &LocalStore,
    registration: &RegistrationClient,
    advertise_ip: &str,
    client_port: u16,
    command_port: u16,
) -> StorageResult<RegistrationOutcome> {
    store.prune_empty_directories().await?;
    let reported = store.list_files().await?;

    let request = RegisterRequest {
        storage_ip: advertise_ip.to_string(),
        client_port,
        command_port,
        files: reported.iter().map(ToString::to_string).collect(),
    };
    let duplicates = registration.register(&request).await?;

    let mut deleted = Vec::new();
    for raw in duplicates {
        let path = match Path::parse(&raw) {
            Ok(path) => path,
            Err(err) => {
                warn!(path = %raw, error = %err, "naming service returned an unusable duplicate");
                continue;
            }
        };
        match store.delete(&path).await {
            Ok(true) => deleted.push(path.clone()),
            Ok(false) => warn!(%path, "duplicate was not present locally"),
            Err(err) => {
                warn!(%path, error = %err, "failed to delete duplicate");
                continue;
            }
        }
        if let Err(err) = store.prune_empty_parents(&path).await {
            warn!(%path, error = %err, "failed to prune directories");
        }
    }

    info!(
        reported = reported.len(),
        deleted = deleted.len(),
        "registered with naming service"
    );
    Ok(RegistrationOutcome { reported, deleted })
}
