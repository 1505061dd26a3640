// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client error types

use dfs_api_contract::{ApiContractError, ErrorKind};
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("contract error: {0}")]
    Contract(#[from] ApiContractError),

    /// The server understood the request and reported a failure
    #[error("{kind}: {message}")]
    Remote {
        status: u16,
        kind: ErrorKind,
        message: String,
    },

    #[error("unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl ClientError {
    /// Error kind to report upstream for this failure.
    ///
    /// Remote failures keep the server's kind. Local decoding problems are
    /// argument errors; anything that went wrong on the wire is an I/O
    /// failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Remote { kind, .. } => *kind,
            ClientError::Contract(err) => err.kind(),
            ClientError::Url(_) => ErrorKind::InvalidArgument,
            ClientError::Http(_) | ClientError::Json(_) | ClientError::UnexpectedResponse { .. } => {
                ErrorKind::IoFailure
            }
        }
    }

    /// Whether the request may not have reached the server at all
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http(_))
    }

    pub fn message(&self) -> String {
        match self {
            ClientError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
