// Shared types and utilities for essnap

pub mod config;
pub mod repository;
pub mod retention;
pub mod schedules;
pub mod snapshot;
pub mod validation;

pub use config::ClusterConfig;
pub use repository::RepositorySettings;
pub use retention::RetentionPolicy;
pub use schedules::{Schedule, ScheduleType, SchedulesConfig};
pub use snapshot::{
    SnapshotDefaults, SnapshotListing, SnapshotRequest, SnapshotState, SnapshotSummary,
    snapshot_name,
};
pub use validation::ValidationError;

/// Root of the snapshot management API
pub const SNAPSHOT_API: &str = "_snapshot";

/// Query flag that makes snapshot creation block until the cluster finishes
pub const WAIT_FOR_COMPLETION: &str = "wait_for_completion";
