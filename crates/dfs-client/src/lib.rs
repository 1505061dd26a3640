// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP clients for the distributed file store
//!
//! One client per listening interface: [`NamingClient`] for the naming
//! service port, [`RegistrationClient`] for the registration port,
//! [`StorageClient`] for a storage node's client port and [`CommandClient`]
//! for its command port. Failed operations come back as
//! [`ClientError::Remote`] carrying the server's error kind unchanged.

pub mod error;
pub mod naming;
pub mod storage;
pub mod transport;

pub use error::{ClientError, ClientResult};
pub use naming::{NamingClient, RegistrationClient};
pub use storage::{CommandClient, StorageClient};
pub use transport::HttpTransport;
