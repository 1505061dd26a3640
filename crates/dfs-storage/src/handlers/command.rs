// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Commands from the naming service: create, delete and copy

use axum::{extract::State, Json};
use dfs_api_contract::{CopyRequest, PathRequest, SuccessResponse};
use tracing::warn;

use crate::error::{ServerResult, WireJson};
use crate::state::AppState;

/// Local I/O failures are reported as `success: false`.
pub async fn create(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    let created = state.store().create(&path).await.unwrap_or_else(|err| {
        warn!(%path, error = %err, "create failed");
        false
    });
    Ok(Json(created.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    let deleted = state.store().delete(&path).await.unwrap_or_else(|err| {
        warn!(%path, error = %err, "delete failed");
        false
    });
    Ok(Json(deleted.into()))
}

/// Pull a file from a peer. Failures of the peer's size or read step come
/// back with the peer's error kind.
pub async fn copy(
    State(state): State<AppState>,
    WireJson(request): WireJson<CopyRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    let copied = state
        .copier
        .copy(&path, &request.server_ip, request.server_port)
        .await?;
    Ok(Json(copied.into()))
}
