// Count and age based retention for scheduled snapshots

use crate::snapshot::{SnapshotState, SnapshotSummary};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Retention policy for the snapshots of one schedule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep only the N most recent snapshots (0 = unlimited)
    pub keep_count: usize,
    /// Maximum age in days (0 = unlimited)
    pub keep_days: u32,
}

impl RetentionPolicy {
    /// Determine which snapshots should be deleted based on this policy
    ///
    /// Only successful snapshots named `{prefix}-...` are considered, and the
    /// most recent of them is never selected. Returns names oldest first.
    pub fn apply(
        &self,
        snapshots: &[SnapshotSummary],
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let name_prefix = format!("{prefix}-");

        let mut candidates: Vec<&SnapshotSummary> = snapshots
            .iter()
            .filter(|s| s.state == SnapshotState::Success)
            .filter(|s| s.snapshot.starts_with(&name_prefix))
            .collect();

        // Generated names embed the timestamp, so they break start time ties
        candidates.sort_by(|a, b| {
            a.start_time_in_millis
                .cmp(&b.start_time_in_millis)
                .then_with(|| a.snapshot.cmp(&b.snapshot))
        });

        let total = candidates.len();
        let max_age = Duration::days(self.keep_days as i64);

        candidates
            .into_iter()
            .enumerate()
            .filter(|(idx, snapshot)| {
                let position_from_end = total - idx;

                // Always keep the newest snapshot
                if position_from_end == 1 {
                    return false;
                }

                if self.keep_count > 0 && position_from_end > self.keep_count {
                    return true;
                }

                if self.keep_days > 0 {
                    if let Some(started) = snapshot.start_time() {
                        return now.signed_duration_since(started) > max_age;
                    }
                }

                false
            })
            .map(|(_, snapshot)| snapshot.snapshot.clone())
            .collect()
    }
}
