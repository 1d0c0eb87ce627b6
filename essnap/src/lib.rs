//! Elasticsearch snapshot administration
//!
//! [`SnapshotAdminClient`] registers and removes snapshot repositories, takes
//! and deletes snapshots, and lists both, over an injected
//! [`ClusterTransport`]. Every operation returns a [`Result`] carrying a
//! [`SnapshotError`] on failure and is logged through the `log` facade.

pub mod audit;
pub mod client;
pub mod error;
pub mod transport;

pub use client::SnapshotAdminClient;
pub use error::{ErrorKind, Result, SnapshotError};
pub use transport::{ClusterRequest, ClusterResponse, ClusterTransport, HttpTransport, Method};
