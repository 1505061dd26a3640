// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage node registration

use axum::{extract::State, Json};
use dfs_api_contract::{FilesResponse, RegisterRequest};

use crate::error::{ServerResult, WireJson};
use crate::state::AppState;

/// Register a storage node; responds with the files it must delete.
pub async fn register(
    State(state): State<AppState>,
    WireJson(request): WireJson<RegisterRequest>,
) -> ServerResult<Json<FilesResponse>> {
    let files = state.service().register(&request).await?;
    Ok(Json(FilesResponse { files }))
}
