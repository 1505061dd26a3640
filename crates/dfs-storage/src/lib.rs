// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Storage node for the distributed file store
//!
//! Holds file bytes under a local root directory. Clients read and write
//! through the client port; the naming service creates, deletes and
//! replicates files through the command port. On startup the node reports
//! its files to the naming service and drops any it is told are duplicates.

pub mod config;
pub mod copy;
pub mod error;
pub mod handlers;
pub mod local;
pub mod server;
pub mod startup;
pub mod state;

pub use config::StorageConfig;
pub use copy::CopyPipeline;
pub use error::{ServerError, ServerResult, StorageError, StorageResult};
pub use local::LocalStore;
pub use server::StorageNode;
pub use startup::{register_and_deduplicate, RegistrationOutcome};
