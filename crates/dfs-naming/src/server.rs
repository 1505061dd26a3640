// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::commands::HttpStorageCommands;
use crate::config::NamingConfig;
use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::service::NamingService;
use crate::state::AppState;

/// Naming server: the client-facing service port plus the registration port
pub struct NamingServer {
    config: NamingConfig,
    state: AppState,
}

impl NamingServer {
    /// Server that sends storage commands over HTTP
    pub fn new(config: NamingConfig) -> Self {
        let commands = Arc::new(HttpStorageCommands::new(config.request_timeout()));
        let service = Arc::new(NamingService::new(commands, config.replication_threshold));
        Self::with_service(config, service)
    }

    /// Construct a server around an already-built service (used with fake fleets)
    pub fn with_service(config: NamingConfig, service: Arc<NamingService>) -> Self {
        let state = AppState::new(config.clone(), service);
        Self { config, state }
    }

    pub fn service(&self) -> Arc<NamingService> {
        self.state.service.clone()
    }

    pub fn service_app(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health::health_check))
            .route("/is_valid_path", post(handlers::service::is_valid_path))
            .route("/getstorage", post(handlers::service::get_storage))
            .route("/delete", post(handlers::service::delete))
            .route("/create_directory", post(handlers::service::create_directory))
            .route("/create_file", post(handlers::service::create_file))
            .route("/list", post(handlers::service::list))
            .route("/is_directory", post(handlers::service::is_directory))
            .route("/lock", post(handlers::service::lock))
            .route("/unlock", post(handlers::service::unlock))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub fn registration_app(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health::health_check))
            .route("/register", post(handlers::registration::register))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured addresses and serve until either listener fails
    pub async fn run(self) -> ServerResult<()> {
        let service = TcpListener::bind(self.config.service_addr).await?;
        let registration = TcpListener::bind(self.config.registration_addr).await?;
        self.serve(service, registration).await
    }

    /// Serve on listeners the caller already bound
    pub async fn serve(self, service: TcpListener, registration: TcpListener) -> ServerResult<()> {
        info!(
            service = %display_addr(&service),
            registration = %display_addr(&registration),
            "naming server listening"
        );

        let service_app = Self::service_app(self.state.clone());
        let registration_app = Self::registration_app(self.state);
        tokio::try_join!(
            async move {
                axum::serve(service, service_app)
                    .await
                    .map_err(|err| ServerError::Internal(format!("service port error: {err}")))
            },
            async move {
                axum::serve(registration, registration_app)
                    .await
                    .map_err(|err| ServerError::Internal(format!("registration port error: {err}")))
            },
        )?;
        Ok(())
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }
}

fn display_addr(listener: &TcpListener) -> String {
    listener
        .local_addr()
        .map(|addr: SocketAddr| addr.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}
