// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error taxonomy shared by every service

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating or decoding contract values
#[derive(Debug, Error)]
pub enum ApiContractError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ApiContractError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// Discriminant of a failed operation.
///
/// The serialized names are stable and are what clients match on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed path, bad offsets, or an otherwise unusable argument
    #[serde(rename = "IllegalArgumentException")]
    InvalidArgument,
    /// Path absent, or present with the wrong type
    #[serde(rename = "FileNotFoundException")]
    FileNotFound,
    /// Read or write range outside the file
    #[serde(rename = "IndexOutOfBoundsException")]
    IndexOutOfBounds,
    /// Local storage I/O failed
    #[serde(rename = "IOException")]
    IoFailure,
    /// A precondition the system cannot satisfy (no storage node, double registration)
    #[serde(rename = "IllegalStateException")]
    IllegalState,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "IllegalArgumentException",
            ErrorKind::FileNotFound => "FileNotFoundException",
            ErrorKind::IndexOutOfBounds => "IndexOutOfBoundsException",
            ErrorKind::IoFailure => "IOException",
            ErrorKind::IllegalState => "IllegalStateException",
        }
    }

    /// HTTP status used when this kind is returned for a well-formed request.
    ///
    /// `400` is reserved for bodies that could not be parsed at all.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 422,
            ErrorKind::FileNotFound => 404,
            ErrorKind::IndexOutOfBounds => 416,
            ErrorKind::IoFailure => 500,
            ErrorKind::IllegalState => 409,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of every failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub exception_type: ErrorKind,
    pub exception_info: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            exception_type: kind,
            exception_info: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_wire_names_are_stable() {
        let body = ErrorResponse::new(ErrorKind::FileNotFound, "no such file: /a");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["exception_type"], "FileNotFoundException");
        assert_eq!(json["exception_info"], "no such file: /a");

        for kind in [
            ErrorKind::InvalidArgument,
            ErrorKind::FileNotFound,
            ErrorKind::IndexOutOfBounds,
            ErrorKind::IoFailure,
            ErrorKind::IllegalState,
        ] {
            let encoded = serde_json::to_string(&kind).unwrap();
            assert_eq!(encoded, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn failure_statuses_never_collide_with_malformed_request() {
        for kind in [
            ErrorKind::InvalidArgument,
            ErrorKind::FileNotFound,
            ErrorKind::IndexOutOfBounds,
            ErrorKind::IoFailure,
            ErrorKind::IllegalState,
        ] {
            assert_ne!(kind.status_code(), 400);
        }
    }
}
