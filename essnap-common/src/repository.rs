//! Snapshot repository registration settings
//!
//! A repository is registered with `PUT /_snapshot/{name}` and a body of the form
//! `{"type": "fs", "settings": {...}}`. The defaults below are the values the
//! deployment has always used: a shared-memory filesystem location with
//! compression on and 40mb throughput caps.

use serde::{Deserialize, Serialize};

/// Storage settings applied when registering a repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepositorySettings {
    /// Repository type understood by the cluster (e.g. "fs")
    #[serde(rename = "type")]
    pub repository_type: String,

    /// Filesystem location shared by all cluster nodes
    pub location: String,

    /// Compress snapshot metadata files
    pub compress: bool,

    /// Large files are split into chunks of this size (e.g. "10m")
    pub chunk_size: String,

    /// Per-node restore throughput cap (e.g. "40mb")
    pub max_restore_bytes_per_sec: String,

    /// Per-node snapshot throughput cap (e.g. "40mb")
    pub max_snapshot_bytes_per_sec: String,

    /// Register the repository read-only
    pub readonly: bool,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repository_type: "fs".to_string(),
            location: "/dev/shm".to_string(),
            compress: true,
            chunk_size: "10m".to_string(),
            max_restore_bytes_per_sec: "40mb".to_string(),
            max_snapshot_bytes_per_sec: "40mb".to_string(),
            readonly: false,
        }
    }
}

impl RepositorySettings {
    /// Same settings with a different storage location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Same settings with compression switched on or off
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Build the JSON body for the repository registration request
    pub fn to_request_body(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.repository_type,
            "settings": {
                "location": self.location,
                "compress": self.compress,
                "chunk_size": self.chunk_size,
                "max_restore_bytes_per_sec": self.max_restore_bytes_per_sec,
                "max_snapshot_bytes_per_sec": self.max_snapshot_bytes_per_sec,
                "readonly": self.readonly,
            }
        })
    }
}
