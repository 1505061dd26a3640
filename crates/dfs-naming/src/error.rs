// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Naming service error types and HTTP mapping

use axum::{
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dfs_api_contract::{ApiContractError, ErrorKind, ErrorResponse};
use dfs_client::ClientError;

pub type NamingResult<T> = Result<T, NamingError>;

/// Failure of a naming operation; each variant is one wire error kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),
}

impl NamingError {
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidArgument | ErrorKind::IndexOutOfBounds => {
                NamingError::InvalidArgument(message)
            }
            ErrorKind::FileNotFound => NamingError::FileNotFound(message),
            ErrorKind::IllegalState => NamingError::IllegalState(message),
            ErrorKind::IoFailure => NamingError::IoFailure(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NamingError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            NamingError::FileNotFound(_) => ErrorKind::FileNotFound,
            NamingError::IllegalState(_) => ErrorKind::IllegalState,
            NamingError::IoFailure(_) => ErrorKind::IoFailure,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            NamingError::InvalidArgument(msg)
            | NamingError::FileNotFound(msg)
            | NamingError::IllegalState(msg)
            | NamingError::IoFailure(msg) => msg,
        }
    }

    pub(crate) fn not_found(path: impl std::fmt::Display) -> Self {
        NamingError::FileNotFound(format!("{} does not exist", path))
    }
}

impl From<ApiContractError> for NamingError {
    fn from(err: ApiContractError) -> Self {
        NamingError::InvalidArgument(err.to_string())
    }
}

impl From<ClientError> for NamingError {
    fn from(err: ClientError) -> Self {
        NamingError::from_kind(err.kind(), err.message())
    }
}

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned from HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// Body could not be decoded at all
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Naming(err) => {
                let kind = err.kind();
                let status = StatusCode::from_u16(kind.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(ErrorResponse::new(kind, err.message()))).into_response()
            }
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ServerError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(ErrorKind::IoFailure, msg)),
            )
                .into_response(),
        }
    }
}

impl From<ApiContractError> for ServerError {
    fn from(err: ApiContractError) -> Self {
        ServerError::Naming(err.into())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {}", err))
    }
}

/// JSON body extractor whose rejections are plain `400 Bad Request`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct WireJson<T>(pub T);
