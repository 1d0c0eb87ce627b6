//! Snapshot administration client
//!
//! Wraps the cluster snapshot API: registering and removing repositories,
//! taking and deleting snapshots, and listing both. Every operation issues
//! exactly one blocking request, logs one line describing the outcome, records
//! an audit event, and returns the outcome to the caller.
//!
//! # Example
//! ```no_run
//! use essnap::client::SnapshotAdminClient;
//! use essnap::transport::HttpTransport;
//!
//! let transport = HttpTransport::new("http://localhost:9200", None)?;
//! let client = SnapshotAdminClient::new(transport);
//!
//! client.create_repository("backup-1", "/dev/shm", true)?;
//! let snapshot = client.create_snapshot("backup-1", "graylog_*")?;
//! println!("created {snapshot}");
//! # Ok::<(), essnap::SnapshotError>(())
//! ```

use crate::audit::{self, Operation};
use crate::error::{Result, SnapshotError};
use crate::transport::{ClusterRequest, ClusterResponse, ClusterTransport, HttpTransport};
use chrono::Utc;
use essnap_common::validation::{
    validate_index_pattern, validate_repository_name, validate_snapshot_name,
};
use essnap_common::{
    ClusterConfig, RepositorySettings, SNAPSHOT_API, SnapshotDefaults, SnapshotListing,
    SnapshotRequest, SnapshotState, SnapshotSummary, WAIT_FOR_COMPLETION, snapshot_name,
};

/// Blocking client for the cluster snapshot API
///
/// The transport is injected at construction so the client can run against a
/// fake endpoint. Repository and snapshot defaults are fixed per client.
pub struct SnapshotAdminClient<T: ClusterTransport = HttpTransport> {
    transport: T,
    repository_defaults: RepositorySettings,
    snapshot_defaults: SnapshotDefaults,
}

impl SnapshotAdminClient<HttpTransport> {
    /// Build an HTTP-backed client from configuration
    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_defaults(
            transport,
            config.repository.clone(),
            config.snapshot,
        ))
    }
}

impl<T: ClusterTransport> SnapshotAdminClient<T> {
    /// Client using the built-in repository and snapshot defaults
    pub fn new(transport: T) -> Self {
        Self::with_defaults(
            transport,
            RepositorySettings::default(),
            SnapshotDefaults::default(),
        )
    }

    pub fn with_defaults(
        transport: T,
        repository_defaults: RepositorySettings,
        snapshot_defaults: SnapshotDefaults,
    ) -> Self {
        Self {
            transport,
            repository_defaults,
            snapshot_defaults,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Settings applied by [`create_repository`](Self::create_repository)
    pub fn repository_defaults(&self) -> &RepositorySettings {
        &self.repository_defaults
    }

    pub fn snapshot_defaults(&self) -> SnapshotDefaults {
        self.snapshot_defaults
    }

    /// Register a repository using the client's configured settings
    ///
    /// `path` and `compress` are accepted for compatibility with existing
    /// callers but are not applied: the repository is always registered with
    /// [`repository_defaults`](Self::repository_defaults). A warning is logged
    /// when the requested values differ. Use
    /// [`create_repository_with`](Self::create_repository_with) to choose the
    /// settings explicitly.
    pub fn create_repository(&self, name: &str, path: &str, compress: bool) -> Result<()> {
        let settings = &self.repository_defaults;

        if path != settings.location || compress != settings.compress {
            log::warn!(
                "Repository '{}': requested location '{}' (compress={}) is not applied, \
                 registering with configured location '{}' (compress={})",
                name,
                path,
                compress,
                settings.location,
                settings.compress
            );
        }

        self.create_repository_with(name, settings)
    }

    /// Register a repository with explicit settings
    pub fn create_repository_with(&self, name: &str, settings: &RepositorySettings) -> Result<()> {
        let outcome = validate_repository_name(name)
            .map_err(SnapshotError::from)
            .and_then(|_| {
                let request = ClusterRequest::put([SNAPSHOT_API, name])
                    .with_body(settings.to_request_body());
                self.send(request).map(|_| ())
            });

        self.report(Operation::CreateRepository, name, outcome, |_| {
            format!(
                "Repository '{}' registered ({} at {})",
                name, settings.repository_type, settings.location
            )
        })
    }

    /// Unregister a repository; its snapshots stay on disk
    pub fn delete_repository(&self, name: &str) -> Result<()> {
        let outcome = validate_repository_name(name)
            .map_err(SnapshotError::from)
            .and_then(|_| {
                self.send(ClusterRequest::delete([SNAPSHOT_API, name]))
                    .map(|_| ())
            });

        self.report(Operation::DeleteRepository, name, outcome, |_| {
            format!("Repository '{}' deleted", name)
        })
    }

    /// Snapshot `indices` into `repository` under a timestamp-generated name
    ///
    /// Blocks until the cluster reports completion and returns the name of the
    /// new snapshot.
    pub fn create_snapshot(&self, repository: &str, indices: &str) -> Result<String> {
        let name = snapshot_name(None, Utc::now());
        let request = SnapshotRequest::new(indices, self.snapshot_defaults);

        self.create_snapshot_named(repository, &name, &request)?;
        Ok(name)
    }

    /// Snapshot into `repository` under an explicit name and body
    ///
    /// Returns the final state the cluster reported, if any. A `FAILED` or
    /// `INCOMPATIBLE` snapshot is an error; `PARTIAL` is returned for the
    /// caller to act on.
    pub fn create_snapshot_named(
        &self,
        repository: &str,
        snapshot: &str,
        request: &SnapshotRequest,
    ) -> Result<Option<SnapshotState>> {
        let resource = format!("{repository}/{snapshot}");

        let outcome = validate_repository_name(repository)
            .and_then(|_| validate_snapshot_name(snapshot))
            .and_then(|_| validate_index_pattern(&request.indices))
            .map_err(SnapshotError::from)
            .and_then(|_| {
                let body = serde_json::to_value(request).map_err(|e| {
                    SnapshotError::InvalidInput {
                        field: "snapshot".to_string(),
                        message: e.to_string(),
                    }
                })?;

                let request = ClusterRequest::put([SNAPSHOT_API, repository, snapshot])
                    .with_query(WAIT_FOR_COMPLETION, "true")
                    .with_body(body);

                self.send(request)
            })
            .and_then(|response| check_completion(snapshot, &response));

        let outcome = self.report(Operation::CreateSnapshot, &resource, outcome, |state| {
            format!(
                "Snapshot '{}' of '{}' completed in repository '{}' (state {})",
                snapshot,
                request.indices,
                repository,
                state.map(|s| s.as_str()).unwrap_or("not reported")
            )
        })?;

        if let Some(state) = outcome.filter(|s| *s != SnapshotState::Success) {
            log::warn!(
                "Snapshot '{}' in repository '{}' finished with state {}",
                snapshot,
                repository,
                state.as_str()
            );
        }

        Ok(outcome)
    }

    /// Delete a snapshot from a repository
    pub fn delete_snapshot(&self, repository: &str, snapshot: &str) -> Result<()> {
        let resource = format!("{repository}/{snapshot}");

        let outcome = validate_repository_name(repository)
            .and_then(|_| validate_snapshot_name(snapshot))
            .map_err(SnapshotError::from)
            .and_then(|_| {
                self.send(ClusterRequest::delete([SNAPSHOT_API, repository, snapshot]))
                    .map(|_| ())
            });

        self.report(Operation::DeleteSnapshot, &resource, outcome, |_| {
            format!(
                "Snapshot '{}' deleted from repository '{}'",
                snapshot, repository
            )
        })
    }

    /// Names of all registered repositories, sorted
    pub fn list_repositories(&self) -> Result<Vec<String>> {
        let outcome = self
            .send(ClusterRequest::get([SNAPSHOT_API]))
            .and_then(|response| {
                let value = response.json()?;
                let repositories = value.as_object().ok_or_else(|| {
                    SnapshotError::MalformedResponse(
                        "expected an object keyed by repository name".to_string(),
                    )
                })?;

                let mut names: Vec<String> = repositories.keys().cloned().collect();
                names.sort();
                Ok(names)
            });

        self.report(Operation::ListRepositories, "*", outcome, |names| {
            format!("Found {} snapshot repositories", names.len())
        })
    }

    /// All snapshots stored in `repository`
    pub fn list_snapshots(&self, repository: &str) -> Result<Vec<SnapshotSummary>> {
        let outcome = validate_repository_name(repository)
            .map_err(SnapshotError::from)
            .and_then(|_| self.send(ClusterRequest::get([SNAPSHOT_API, repository, "_all"])))
            .and_then(|response| {
                serde_json::from_str::<SnapshotListing>(&response.body)
                    .map(|listing| listing.snapshots)
                    .map_err(|e| {
                        SnapshotError::MalformedResponse(format!("invalid snapshot listing: {e}"))
                    })
            });

        self.report(Operation::ListSnapshots, repository, outcome, |snapshots| {
            format!(
                "Found {} snapshots in repository '{}'",
                snapshots.len(),
                repository
            )
        })
    }

    /// Execute one request, turning non-success answers into errors
    fn send(&self, request: ClusterRequest) -> Result<ClusterResponse> {
        log::debug!(
            "{} {}",
            request.method.as_str(),
            request.display_path()
        );

        let response = self.transport.execute(&request)?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(SnapshotError::rejected(response.status, &response.body))
        }
    }

    /// Log and audit an outcome, then hand it back to the caller
    fn report<R>(
        &self,
        operation: Operation,
        resource: &str,
        outcome: Result<R>,
        describe_success: impl FnOnce(&R) -> String,
    ) -> Result<R> {
        match &outcome {
            Ok(value) => {
                log::info!("{}", describe_success(value));
                audit::record(operation, resource, None);
            }
            Err(e) => {
                log::error!("{} '{}': {}", failure_message(operation), resource, e);
                audit::record(operation, resource, Some(&e.to_string()));
            }
        }

        outcome
    }
}

fn failure_message(operation: Operation) -> &'static str {
    match operation {
        Operation::CreateRepository => "Failed to create repository",
        Operation::DeleteRepository => "Failed to delete repository",
        Operation::ListRepositories => "Failed to list repositories",
        Operation::CreateSnapshot => "Failed to create snapshot",
        Operation::DeleteSnapshot => "Failed to delete snapshot",
        Operation::ListSnapshots => "Failed to list snapshots in repository",
    }
}

/// State reported by a `wait_for_completion` snapshot response, if any
fn completed_state(response: &ClusterResponse) -> Option<SnapshotState> {
    let value = response.json().ok()?;
    serde_json::from_value(value.get("snapshot")?.get("state")?.clone()).ok()
}

/// Turn a completed snapshot that did not store its data into an error
fn check_completion(snapshot: &str, response: &ClusterResponse) -> Result<Option<SnapshotState>> {
    match completed_state(response) {
        Some(state @ (SnapshotState::Failed | SnapshotState::Incompatible)) => {
            let reason = response
                .json()
                .ok()
                .and_then(|v| v["snapshot"]["reason"].as_str().map(str::to_string))
                .unwrap_or_else(|| "no reason reported".to_string());

            Err(SnapshotError::SnapshotFailed {
                snapshot: snapshot.to_string(),
                state,
                reason,
            })
        }
        state => Ok(state),
    }
}
