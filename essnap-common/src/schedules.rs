// Snapshot schedule configuration with TOML support

use crate::retention::RetentionPolicy;
use crate::validation::{
    validate_index_pattern, validate_repository_name, validate_snapshot_prefix,
    validate_time_format,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Repository used by the built-in schedules
pub const DEFAULT_SCHEDULE_REPOSITORY: &str = "backups";

/// Type of snapshot schedule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleType {
    pub fn as_str(&self) -> &str {
        match self {
            ScheduleType::Hourly => "hourly",
            ScheduleType::Daily => "daily",
            ScheduleType::Weekly => "weekly",
            ScheduleType::Monthly => "monthly",
        }
    }
}

/// A single snapshot schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    /// Whether this schedule is enabled
    pub enabled: bool,

    /// Type of schedule (hourly, daily, weekly, monthly)
    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,

    /// Time of day for daily/weekly/monthly schedules (HH:MM format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Day of week for weekly schedules (0-6, where 0=Sunday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,

    /// Day of month for monthly schedules (1-31, clamped to short months)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,

    /// Snapshot name prefix (e.g., "hourly", "daily")
    pub prefix: String,

    /// Repository the snapshots are written to
    pub repository: String,

    /// Index name or pattern to snapshot
    pub indices: String,

    /// Maximum number of snapshots to keep for this schedule (0 = unlimited)
    pub keep_count: u32,

    /// Maximum age in days for snapshots from this schedule (0 = unlimited)
    pub keep_days: u32,
}

impl Schedule {
    fn builtin(
        schedule_type: ScheduleType,
        enabled: bool,
        time: Option<&str>,
        keep_count: u32,
        keep_days: u32,
    ) -> Self {
        Self {
            enabled,
            schedule_type,
            time: time.map(str::to_string),
            day_of_week: None,
            day_of_month: None,
            prefix: schedule_type.as_str().to_string(),
            repository: DEFAULT_SCHEDULE_REPOSITORY.to_string(),
            indices: "*".to_string(),
            keep_count,
            keep_days,
        }
    }

    /// Create a default hourly schedule (disabled)
    pub fn default_hourly() -> Self {
        Self::builtin(ScheduleType::Hourly, false, None, 24, 1)
    }

    /// Create a default daily schedule (enabled)
    pub fn default_daily() -> Self {
        Self::builtin(ScheduleType::Daily, true, Some("02:00"), 7, 7)
    }

    /// Create a default weekly schedule (disabled)
    pub fn default_weekly() -> Self {
        Self {
            day_of_week: Some(0), // Sunday
            ..Self::builtin(ScheduleType::Weekly, false, Some("03:00"), 4, 28)
        }
    }

    /// Create a default monthly schedule (disabled)
    pub fn default_monthly() -> Self {
        Self {
            day_of_month: Some(1),
            ..Self::builtin(ScheduleType::Monthly, false, Some("04:00"), 3, 90)
        }
    }

    /// Retention policy for the snapshots of this schedule
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            keep_count: self.keep_count as usize,
            keep_days: self.keep_days,
        }
    }

    /// Validate this schedule configuration
    pub fn validate(&self) -> Result<(), String> {
        validate_snapshot_prefix(&self.prefix).map_err(|e| e.to_string())?;
        validate_repository_name(&self.repository).map_err(|e| e.to_string())?;
        validate_index_pattern(&self.indices).map_err(|e| e.to_string())?;

        if let Some(ref time) = self.time {
            validate_time_format(time)
                .map_err(|e| format!("Invalid time '{}': {}", time, e))?;
        }

        if let Some(day) = self.day_of_week {
            if day > 6 {
                return Err(format!(
                    "Invalid day_of_week {}. Must be 0-6 (0=Sunday)",
                    day
                ));
            }
        }

        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(format!("Invalid day_of_month {}. Must be 1-31", day));
            }
        }

        // Type-specific validations
        match self.schedule_type {
            ScheduleType::Hourly => {}
            ScheduleType::Daily => {
                if self.time.is_none() {
                    return Err("Daily schedule requires 'time' field".to_string());
                }
            }
            ScheduleType::Weekly => {
                if self.time.is_none() {
                    return Err("Weekly schedule requires 'time' field".to_string());
                }
                if self.day_of_week.is_none() {
                    return Err("Weekly schedule requires 'day_of_week' field".to_string());
                }
            }
            ScheduleType::Monthly => {
                if self.time.is_none() {
                    return Err("Monthly schedule requires 'time' field".to_string());
                }
                if self.day_of_month.is_none() {
                    return Err("Monthly schedule requires 'day_of_month' field".to_string());
                }
            }
        }

        Ok(())
    }
}

/// Container for all snapshot schedules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulesConfig {
    #[serde(rename = "schedule", default)]
    pub schedules: Vec<Schedule>,
}

impl Default for SchedulesConfig {
    fn default() -> Self {
        Self {
            schedules: vec![
                Schedule::default_hourly(),
                Schedule::default_daily(),
                Schedule::default_weekly(),
                Schedule::default_monthly(),
            ],
        }
    }
}

impl SchedulesConfig {
    /// Load schedules from a TOML file
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SchedulesConfig = toml::from_str(&content)?;

        for schedule in &config.schedules {
            schedule
                .validate()
                .map_err(|e| anyhow::anyhow!("Schedule '{}': {}", schedule.prefix, e))?;
        }

        Ok(config)
    }

    /// Save schedules to a TOML file
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        for schedule in &self.schedules {
            schedule
                .validate()
                .map_err(|e| anyhow::anyhow!("Schedule '{}': {}", schedule.prefix, e))?;
        }

        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get all enabled schedules
    pub fn enabled_schedules(&self) -> Vec<&Schedule> {
        self.schedules.iter().filter(|s| s.enabled).collect()
    }

    /// Get schedule by type
    pub fn get_schedule(&self, schedule_type: ScheduleType) -> Option<&Schedule> {
        self.schedules
            .iter()
            .find(|s| s.schedule_type == schedule_type)
    }
}
