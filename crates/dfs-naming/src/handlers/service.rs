// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client-facing naming operations

use axum::{extract::State, Json};
use dfs_api_contract::{Ack, FilesResponse, LockRequest, PathRequest, ServerInfo, SuccessResponse};

use crate::error::{ServerResult, WireJson};
use crate::state::AppState;

/// Never fails: a malformed path is simply not valid.
pub async fn is_valid_path(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    Ok(Json(state.service().is_valid_path(&request.path).into()))
}

pub async fn get_storage(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<ServerInfo>> {
    let path = request.parse_path()?;
    Ok(Json(state.service().get_storage(&path)?))
}

pub async fn delete(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    Ok(Json(state.service().delete(&path).await?.into()))
}

pub async fn create_directory(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    Ok(Json(state.service().create_directory(&path).await?.into()))
}

pub async fn create_file(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    Ok(Json(state.service().create_file(&path).await?.into()))
}

pub async fn list(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<FilesResponse>> {
    let path = request.parse_path()?;
    let files = state.service().list(&path)?;
    Ok(Json(FilesResponse { files }))
}

pub async fn is_directory(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    Ok(Json(state.service().is_directory(&path)?.into()))
}

/// Blocks until the lock is granted.
pub async fn lock(
    State(state): State<AppState>,
    WireJson(request): WireJson<LockRequest>,
) -> ServerResult<Json<Ack>> {
    let path = request.parse_path()?;
    state.service().lock(&path, request.exclusive).await?;
    Ok(Json(Ack {}))
}

pub async fn unlock(
    State(state): State<AppState>,
    WireJson(request): WireJson<LockRequest>,
) -> ServerResult<Json<Ack>> {
    let path = request.parse_path()?;
    state.service().unlock(&path, request.exclusive)?;
    Ok(Json(Ack {}))
}
