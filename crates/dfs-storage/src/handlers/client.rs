// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client data I/O: size, read and write

use axum::{extract::State, Json};
use dfs_api_contract::{DataResponse, PathRequest, ReadRequest, SizeResponse, SuccessResponse, WriteRequest};

use crate::error::{ServerResult, WireJson};
use crate::state::AppState;

pub async fn size(
    State(state): State<AppState>,
    WireJson(request): WireJson<PathRequest>,
) -> ServerResult<Json<SizeResponse>> {
    let path = request.parse_path()?;
    let size = state.store().size(&path).await?;
    Ok(Json(SizeResponse { size }))
}

pub async fn read(
    State(state): State<AppState>,
    WireJson(request): WireJson<ReadRequest>,
) -> ServerResult<Json<DataResponse>> {
    let path = request.parse_path()?;
    let bytes = state
        .store()
        .read(&path, request.offset, request.length)
        .await?;
    Ok(Json(DataResponse::encode(&bytes)))
}

pub async fn write(
    State(state): State<AppState>,
    WireJson(request): WireJson<WriteRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    let path = request.parse_path()?;
    let data = request.decode_data()?;
    state.store().write(&path, request.offset, &data).await?;
    Ok(Json(true.into()))
}
