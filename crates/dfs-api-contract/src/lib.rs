// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Wire contract for the distributed file store
//!
//! This crate defines the logical [`Path`] type, the error taxonomy carried
//! in every failed response, and the JSON request/response bodies of the
//! naming service, registration, storage client and storage command
//! interfaces. Servers and clients both depend on it so the two sides can
//! never disagree about field names.

pub mod error;
pub mod path;
pub mod types;

pub use error::*;
pub use path::Path;
pub use types::*;
