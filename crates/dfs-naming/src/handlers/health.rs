// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ServerResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage_nodes: usize,
}

pub async fn health_check(State(state): State<AppState>) -> ServerResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        storage_nodes: state.service().registry().len(),
    }))
}
