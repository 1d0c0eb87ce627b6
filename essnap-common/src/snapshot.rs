// Snapshot request bodies, listing entries and name generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for generated snapshot names.
///
/// Calendar date followed by 24-hour time with seconds, all lower-case so the
/// result is accepted as a snapshot name by the cluster.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Generate a snapshot name from the given time
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use essnap_common::snapshot::snapshot_name;
///
/// let at = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();
/// assert_eq!(snapshot_name(None, at), "2025-03-07-14:05:09");
/// assert_eq!(snapshot_name(Some("daily"), at), "daily-2025-03-07-14:05:09");
/// ```
pub fn snapshot_name(prefix: Option<&str>, at: DateTime<Utc>) -> String {
    let stamp = at.format(SNAPSHOT_TIMESTAMP_FORMAT);
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}-{stamp}"),
        _ => stamp.to_string(),
    }
}

/// Defaults for the snapshot creation body
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnapshotDefaults {
    /// Skip indices that are missing or closed instead of failing
    pub ignore_unavailable: bool,
    /// Include cluster-wide metadata (templates, persistent settings)
    pub include_global_state: bool,
}

impl Default for SnapshotDefaults {
    fn default() -> Self {
        Self {
            ignore_unavailable: true,
            include_global_state: false,
        }
    }
}

/// Body of `PUT /_snapshot/{repository}/{snapshot}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotRequest {
    /// Index name or pattern (comma separated list allowed)
    pub indices: String,
    pub ignore_unavailable: bool,
    pub include_global_state: bool,
}

impl SnapshotRequest {
    /// Request for `indices` using the given defaults
    pub fn new(indices: impl Into<String>, defaults: SnapshotDefaults) -> Self {
        Self {
            indices: indices.into(),
            ignore_unavailable: defaults.ignore_unavailable,
            include_global_state: defaults.include_global_state,
        }
    }
}

/// Snapshot state as reported by the cluster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    InProgress,
    Success,
    Failed,
    Partial,
    Incompatible,
    #[serde(other)]
    Unknown,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotState::InProgress => "IN_PROGRESS",
            SnapshotState::Success => "SUCCESS",
            SnapshotState::Failed => "FAILED",
            SnapshotState::Partial => "PARTIAL",
            SnapshotState::Incompatible => "INCOMPATIBLE",
            SnapshotState::Unknown => "UNKNOWN",
        }
    }
}

/// One entry of `GET /_snapshot/{repository}/_all`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Snapshot name
    pub snapshot: String,
    pub state: SnapshotState,
    #[serde(default)]
    pub start_time_in_millis: Option<i64>,
    #[serde(default)]
    pub indices: Vec<String>,
}

impl SnapshotSummary {
    /// When the snapshot started, if the cluster reported it
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time_in_millis
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Response wrapper of the snapshot listing call
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotListing {
    #[serde(default)]
    pub snapshots: Vec<SnapshotSummary>,
}
