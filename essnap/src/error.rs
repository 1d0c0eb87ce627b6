//! Error type returned by every snapshot administration operation

use essnap_common::{SnapshotState, ValidationError};

/// Broad category of a [`SnapshotError`], for callers deciding whether to
/// retry, escalate or give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Transport,
    Rejected,
    MalformedResponse,
    SnapshotFailed,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Transport => "transport",
            ErrorKind::Rejected => "rejected",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::SnapshotFailed => "snapshot_failed",
            ErrorKind::Config => "config",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Input refused locally; nothing was sent to the cluster
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Connection, IO or timeout failure talking to the cluster
    #[error("transport error: {0}")]
    Transport(String),

    /// The cluster answered with a non-success status
    #[error("cluster rejected request ({status}): {reason}")]
    Rejected {
        status: u16,
        error_type: Option<String>,
        reason: String,
    },

    /// Success status but a body we could not interpret
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The snapshot ran to completion without storing its data
    #[error("snapshot {snapshot} finished with state {}: {reason}", .state.as_str())]
    SnapshotFailed {
        snapshot: String,
        state: SnapshotState,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SnapshotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::InvalidInput { .. } => ErrorKind::InvalidInput,
            SnapshotError::Transport(_) => ErrorKind::Transport,
            SnapshotError::Rejected { .. } => ErrorKind::Rejected,
            SnapshotError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            SnapshotError::SnapshotFailed { .. } => ErrorKind::SnapshotFailed,
            SnapshotError::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status of a cluster rejection
    pub fn status(&self) -> Option<u16> {
        match self {
            SnapshotError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a rejection from a non-success response body
    ///
    /// Understands the structured `{"error": {"type", "reason"}, "status"}`
    /// shape, the older `{"error": "..."}` shape, and falls back to the raw body.
    pub fn rejected(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let (error_type, reason) = match error {
            Some(serde_json::Value::Object(obj)) => (
                obj.get("type").and_then(|t| t.as_str()).map(str::to_string),
                obj.get("reason")
                    .and_then(|r| r.as_str())
                    .map(str::to_string),
            ),
            Some(serde_json::Value::String(text)) => (None, Some(text.clone())),
            _ => (None, None),
        };

        let reason = reason.unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                trimmed.to_string()
            }
        });

        SnapshotError::Rejected {
            status,
            error_type,
            reason,
        }
    }
}

impl From<ValidationError> for SnapshotError {
    fn from(err: ValidationError) -> Self {
        SnapshotError::InvalidInput {
            field: err.field,
            message: err.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
