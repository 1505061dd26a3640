// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Naming service for the distributed file store
//!
//! Owns the namespace: which paths exist, which are directories, and which
//! storage nodes hold each file. Clients coordinate through hierarchical
//! shared/exclusive locks; shared grants drive read replication and
//! exclusive grants shrink a file back to a single copy.

pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lock;
pub mod registry;
pub mod server;
pub mod service;
pub mod state;
pub mod testing;
pub mod tree;

pub use commands::{HttpStorageCommands, StorageCommands};
pub use config::NamingConfig;
pub use error::{NamingError, NamingResult, ServerError, ServerResult};
pub use lock::{Holders, LockManager, LockMode};
pub use registry::{HostSet, StorageNodeId, StorageRegistry};
pub use server::NamingServer;
pub use service::NamingService;
pub use tree::DirectoryTree;
