//! Structured audit logging for snapshot administration operations

use chrono::Utc;

/// Operations recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateRepository,
    DeleteRepository,
    ListRepositories,
    CreateSnapshot,
    DeleteSnapshot,
    ListSnapshots,
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::CreateRepository => "create_repository",
            Operation::DeleteRepository => "delete_repository",
            Operation::ListRepositories => "list_repositories",
            Operation::CreateSnapshot => "create_snapshot",
            Operation::DeleteSnapshot => "delete_snapshot",
            Operation::ListSnapshots => "list_snapshots",
        }
    }
}

/// Audit log entry for one operation
#[derive(Debug, serde::Serialize)]
pub struct AuditEvent {
    timestamp: String,
    operation: String,
    resource: String,
    result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AuditEvent {
    pub fn new(operation: Operation, resource: &str, success: bool) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            operation: operation.as_str().to_string(),
            resource: resource.to_string(),
            result: if success { "success" } else { "failure" }.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Render the event as a JSON line, falling back to key=value pairs
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "operation={} resource={} result={}",
                self.operation, self.resource, self.result
            )
        })
    }

    /// Log the audit event as structured JSON
    pub fn log(&self) {
        log::info!(target: "audit", "{}", self.render());
    }
}

/// Record the outcome of an operation
pub fn record(operation: Operation, resource: &str, error: Option<&str>) {
    let mut event = AuditEvent::new(operation, resource, error.is_none());

    if let Some(err) = error {
        event = event.with_details(format!("error: {err}"));
    }

    event.log();
}
