// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server state management

use std::sync::Arc;

use crate::config::NamingConfig;
use crate::service::NamingService;

/// Shared state behind both listeners
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NamingService>,
    pub config: NamingConfig,
}

impl AppState {
    pub fn new(config: NamingConfig, service: Arc<NamingService>) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &NamingService {
        &self.service
    }
}
