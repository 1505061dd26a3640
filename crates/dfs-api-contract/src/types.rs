// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Request and response bodies
//!
//! Paths travel as raw strings so that a malformed path reaches the handler
//! and is reported as `IllegalArgumentException` instead of being rejected
//! as an unparsable body. Offsets and lengths are signed for the same
//! reason: a negative offset is an `IndexOutOfBoundsException`, not a
//! decoding failure.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::ApiContractError;
use crate::path::Path;

/// Body carrying just a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

impl PathRequest {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    pub fn parse_path(&self) -> Result<Path, ApiContractError> {
        Path::parse(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    pub path: String,
    pub exclusive: bool,
}

impl LockRequest {
    pub fn new(path: &Path, exclusive: bool) -> Self {
        Self {
            path: path.to_string(),
            exclusive,
        }
    }

    pub fn parse_path(&self) -> Result<Path, ApiContractError> {
        Path::parse(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub path: String,
    pub offset: i64,
    pub length: i64,
}

impl ReadRequest {
    pub fn new(path: &Path, offset: i64, length: i64) -> Self {
        Self {
            path: path.to_string(),
            offset,
            length,
        }
    }

    pub fn parse_path(&self) -> Result<Path, ApiContractError> {
        Path::parse(&self.path)
    }
}

/// Write request; `data` is standard base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub path: String,
    pub offset: i64,
    pub data: String,
}

impl WriteRequest {
    pub fn new(path: &Path, offset: i64, bytes: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            offset,
            data: STANDARD.encode(bytes),
        }
    }

    pub fn parse_path(&self) -> Result<Path, ApiContractError> {
        Path::parse(&self.path)
    }

    pub fn decode_data(&self) -> Result<Vec<u8>, ApiContractError> {
        Ok(STANDARD.decode(&self.data)?)
    }
}

/// Ask a storage node to pull `path` from the node at `server_ip:server_port`
/// (that node's client port).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRequest {
    pub path: String,
    pub server_ip: String,
    pub server_port: u16,
}

impl CopyRequest {
    pub fn new(path: &Path, server_ip: impl Into<String>, server_port: u16) -> Self {
        Self {
            path: path.to_string(),
            server_ip: server_ip.into(),
            server_port,
        }
    }

    pub fn parse_path(&self) -> Result<Path, ApiContractError> {
        Path::parse(&self.path)
    }
}

/// Storage node registration handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub storage_ip: String,
    pub client_port: u16,
    pub command_port: u16,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Boolean outcome of a mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl From<bool> for SuccessResponse {
    fn from(success: bool) -> Self {
        Self { success }
    }
}

/// Where a client should send data I/O for a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_ip: String,
    pub server_port: u16,
}

/// A list of paths or names (directory listings, duplicate files)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeResponse {
    pub size: u64,
}

/// Bytes read from a file, standard base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: String,
}

impl DataResponse {
    pub fn encode(bytes: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, ApiContractError> {
        Ok(STANDARD.decode(&self.data)?)
    }
}

/// Empty acknowledgement (lock/unlock)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}
