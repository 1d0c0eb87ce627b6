// Centralized configuration for essnap

use crate::repository::RepositorySettings;
use crate::snapshot::SnapshotDefaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/essnap/essnap.toml";

/// Cluster connection and request defaults, loaded from TOML with
/// environment variable overrides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URL of the cluster REST API (default: http://localhost:9200)
    pub url: String,

    /// Client-side request timeout in seconds. Unset means no timeout, which
    /// lets snapshot creation block until the cluster reports completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Path to schedules TOML configuration (default: /etc/essnap/schedules.toml)
    pub schedules_config: PathBuf,

    /// Settings used when registering repositories
    pub repository: RepositorySettings,

    /// Defaults for the snapshot creation body
    pub snapshot: SnapshotDefaults,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            request_timeout_secs: None,
            schedules_config: PathBuf::from("/etc/essnap/schedules.toml"),
            repository: RepositorySettings::default(),
            snapshot: SnapshotDefaults::default(),
        }
    }
}

impl ClusterConfig {
    /// Load configuration from the default path (or `ESSNAP_CONFIG`) and apply
    /// environment variable overrides
    ///
    /// Supported environment variables:
    /// - ESSNAP_CONFIG: Override configuration file path
    /// - ESSNAP_URL: Override cluster base URL
    /// - ESSNAP_TIMEOUT_SECS: Override request timeout (in seconds)
    /// - ESSNAP_SCHEDULES_CONFIG: Override schedules TOML config path
    /// - ESSNAP_REPOSITORY_LOCATION: Override repository location
    pub fn new() -> anyhow::Result<Self> {
        let path = std::env::var("ESSNAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::load_with_env(&path)
    }

    /// Load configuration from `path` and apply environment variable overrides
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ESSNAP_URL") {
            self.url = url;
        }

        if let Some(secs) = lookup("ESSNAP_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(e) => log::warn!("Ignoring ESSNAP_TIMEOUT_SECS='{}': {}", secs, e),
            }
        }

        if let Some(conf) = lookup("ESSNAP_SCHEDULES_CONFIG") {
            self.schedules_config = PathBuf::from(conf);
        }

        if let Some(location) = lookup("ESSNAP_REPOSITORY_LOCATION") {
            self.repository.location = location;
        }
    }
}
