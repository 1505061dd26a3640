// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use dfs_client::RegistrationClient;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::StorageConfig;
use crate::copy::CopyPipeline;
use crate::error::{ServerError, ServerResult, StorageError};
use crate::handlers;
use crate::local::LocalStore;
use crate::startup::{register_and_deduplicate, RegistrationOutcome};
use crate::state::AppState;

/// Storage node: a client port for data I/O and a command port for the
/// naming service
pub struct StorageNode {
    config: StorageConfig,
    state: AppState,
}

impl StorageNode {
    /// Open (creating if needed) the configured root directory
    pub async fn new(config: StorageConfig) -> ServerResult<Self> {
        let store = Arc::new(LocalStore::open(&config.root_dir).await?);
        let copier = CopyPipeline::new(store.clone(), config.copy_attempts, config.request_timeout());
        let state = AppState::new(store, copier);
        Ok(Self { config, state })
    }

    pub fn store(&self) -> Arc<LocalStore> {
        self.state.store.clone()
    }

    pub fn client_app(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health::health_check))
            .route("/storage_size", post(handlers::client::size))
            .route("/storage_read", post(handlers::client::read))
            .route("/storage_write", post(handlers::client::write))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub fn command_app(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health::health_check))
            .route("/storage_create", post(handlers::command::create))
            .route("/storage_delete", post(handlers::command::delete))
            .route("/storage_copy", post(handlers::command::copy))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured addresses, register and serve
    pub async fn run(self) -> ServerResult<()> {
        let client = TcpListener::bind(self.config.client_addr).await?;
        let command = TcpListener::bind(self.config.command_addr).await?;
        self.serve(client, command).await
    }

    /// Start serving on already-bound listeners, register with the naming
    /// service, then keep serving until a listener fails.
    ///
    /// Serving starts before registration so the naming service can send
    /// commands as soon as it knows about this node.
    pub async fn serve(self, client: TcpListener, command: TcpListener) -> ServerResult<()> {
        let client_port = client.local_addr()?.port();
        let command_port = command.local_addr()?.port();
        info!(
            client_port,
            command_port,
            root = %self.config.root_dir.display(),
            "storage node listening"
        );

        let client_app = Self::client_app(self.state.clone());
        let command_app = Self::command_app(self.state.clone());
        let client_task = tokio::spawn(async move { axum::serve(client, client_app).await });
        let command_task = tokio::spawn(async move { axum::serve(command, command_app).await });

        if let Err(err) = self.register(client_port, command_port).await {
            client_task.abort();
            command_task.abort();
            return Err(err.into());
        }

        let (client_result, command_result) = tokio::join!(client_task, command_task);
        flatten(client_result, "client port")?;
        flatten(command_result, "command port")?;
        Ok(())
    }

    async fn register(
        &self,
        client_port: u16,
        command_port: u16,
    ) -> Result<RegistrationOutcome, StorageError> {
        let registration = RegistrationClient::from_url(
            &self.config.naming_registration_url,
            self.config.request_timeout(),
        )?;
        register_and_deduplicate(
            self.state.store(),
            &registration,
            &self.config.advertise_ip,
            client_port,
            command_port,
        )
        .await
    }
}

fn flatten(result: Result<std::io::Result<()>, JoinError>, listener: &str) -> ServerResult<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ServerError::Internal(format!("{listener} error: {err}"))),
        Err(err) => Err(ServerError::Internal(format!("{listener} task failed: {err}"))),
    }
}
