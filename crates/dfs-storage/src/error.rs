// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage node error types and HTTP mapping

use axum::{
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dfs_api_contract::{ApiContractError, ErrorKind, ErrorResponse};
use dfs_client::ClientError;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl StorageError {
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidArgument => StorageError::InvalidArgument(message),
            ErrorKind::FileNotFound => StorageError::FileNotFound(message),
            ErrorKind::IndexOutOfBounds => StorageError::IndexOutOfBounds(message),
            ErrorKind::IoFailure => StorageError::IoFailure(message),
            ErrorKind::IllegalState => StorageError::IllegalState(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorageError::FileNotFound(_) => ErrorKind::FileNotFound,
            StorageError::IndexOutOfBounds(_) => ErrorKind::IndexOutOfBounds,
            StorageError::IoFailure(_) => ErrorKind::IoFailure,
            StorageError::IllegalState(_) => ErrorKind::IllegalState,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StorageError::InvalidArgument(msg)
            | StorageError::FileNotFound(msg)
            | StorageError::IndexOutOfBounds(msg)
            | StorageError::IoFailure(msg)
            | StorageError::IllegalState(msg) => msg,
        }
    }
}

impl From<ApiContractError> for StorageError {
    fn from(err: ApiContractError) -> Self {
        StorageError::from_kind(err.kind(), err.to_string())
    }
}

/// Failures of a peer RPC keep the peer's kind
impl From<ClientError> for StorageError {
    fn from(err: ClientError) -> Self {
        StorageError::from_kind(err.kind(), err.message())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoFailure(err.to_string())
    }
}

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned from HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Storage(err) => {
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
        ServerError::Storage(err.into())
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
