// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server state management

use std::sync::Arc;

use crate::copy::CopyPipeline;
use crate::local::LocalStore;

/// Shared state behind the client and command listeners
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LocalStore>,
    pub copier: CopyPipeline,
}

impl AppState {
    pub fn new(store: Arc<LocalStore>, copier: CopyPipeline) -> Self {
        Self { store, copier }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }
}
