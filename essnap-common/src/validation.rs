//! Name and configuration validation
//!
//! Repository, snapshot and index names are checked locally before any request
//! is sent so that obviously bad input never reaches the cluster. The rules
//! mirror the ones the cluster applies to snapshot and repository names.

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Characters the cluster refuses in repository and snapshot names
const INVALID_NAME_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#'];

fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new(field, "cannot be empty"));
    }

    if name.len() > 255 {
        return Err(ValidationError::new(field, "too long (max 255 bytes)"));
    }

    if let Some(c) = name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
        return Err(ValidationError::new(
            field,
            format!("cannot contain '{c}'"),
        ));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(field, "cannot contain whitespace"));
    }

    if name.starts_with('_') {
        return Err(ValidationError::new(field, "cannot start with '_'"));
    }

    Ok(())
}

/// Validate a repository name
///
/// # Examples
/// ```
/// # use essnap_common::validation::validate_repository_name;
/// assert!(validate_repository_name("backup-1").is_ok());
/// assert!(validate_repository_name("").is_err());
/// assert!(validate_repository_name("a/b").is_err());
/// assert!(validate_repository_name("_all").is_err());
/// ```
pub fn validate_repository_name(name: &str) -> Result<(), ValidationError> {
    validate_name("repository", name)
}

/// Validate a snapshot name
///
/// Same rules as repository names, and the name must be lower-case.
pub fn validate_snapshot_name(name: &str) -> Result<(), ValidationError> {
    validate_name("snapshot", name)?;

    if name.to_lowercase() != name {
        return Err(ValidationError::new("snapshot", "must be lower-case"));
    }

    Ok(())
}

/// Validate an index name or pattern (`graylog_*`, `a,b`)
pub fn validate_index_pattern(pattern: &str) -> Result<(), ValidationError> {
    if pattern.trim().is_empty() {
        return Err(ValidationError::new("indices", "cannot be empty"));
    }

    if pattern.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("indices", "cannot contain whitespace"));
    }

    Ok(())
}

/// Validate a scheduled snapshot prefix
///
/// Only lower-case letters, digits, dashes and underscores, so that
/// `{prefix}-{timestamp}` is always a valid snapshot name.
pub fn validate_snapshot_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() {
        return Err(ValidationError::new("prefix", "cannot be empty"));
    }

    if prefix.len() > 50 {
        return Err(ValidationError::new("prefix", "too long (max 50 characters)"));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ValidationError::new(
            "prefix",
            "can only contain lower-case letters, numbers, dashes and underscores",
        ));
    }

    if prefix.starts_with('-') || prefix.starts_with('_') {
        return Err(ValidationError::new("prefix", "cannot start with '-' or '_'"));
    }

    Ok(())
}

/// Validate a time string in HH:MM format
///
/// # Examples
/// ```
/// # use essnap_common::validation::validate_time_format;
/// assert!(validate_time_format("02:00").is_ok());
/// assert!(validate_time_format("23:59").is_ok());
/// assert!(validate_time_format("24:00").is_err());
/// assert!(validate_time_format("2:00").is_err()); // Must be zero-padded
/// ```
pub fn validate_time_format(time: &str) -> Result<(), String> {
    let Some((hours, minutes)) = time.split_once(':') else {
        return Err("Time must be in HH:MM format (e.g., 02:00)".to_string());
    };

    if hours.len() != 2 || minutes.len() != 2 {
        return Err("Hours and minutes must be zero-padded (e.g., 02:00)".to_string());
    }

    let hours: u32 = hours
        .parse()
        .map_err(|_| "Hours must be a number".to_string())?;
    if hours > 23 {
        return Err("Hours must be between 00 and 23".to_string());
    }

    let minutes: u32 = minutes
        .parse()
        .map_err(|_| "Minutes must be a number".to_string())?;
    if minutes > 59 {
        return Err("Minutes must be between 00 and 59".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_names() {
        assert!(validate_repository_name("backup-1").is_ok());
        assert!(validate_repository_name("graylog_backups").is_ok());

        assert!(validate_repository_name("").is_err());
        assert!(validate_repository_name("has space").is_err());
        assert!(validate_repository_name("a,b").is_err());
        assert!(validate_repository_name("_leading").is_err());
        assert!(validate_repository_name("-tmp").is_ok());
        assert!(validate_repository_name("+archive").is_ok());
        assert!(validate_repository_name(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_snapshot_names() {
        assert!(validate_snapshot_name("2025-01-31-10:00:00").is_ok());
        assert!(validate_snapshot_name("daily-2025-01-31-10:00:00").is_ok());

        let err = validate_snapshot_name("Daily").unwrap_err();
        assert_eq!(err.field, "snapshot");
        assert!(err.message.contains("lower-case"));

        assert!(validate_snapshot_name("snap#1").is_err());
        assert!(validate_snapshot_name("_snap").is_err());
    }

    #[test]
    fn test_index_patterns() {
        assert!(validate_index_pattern("graylog_*").is_ok());
        assert!(validate_index_pattern("logs-a,logs-b").is_ok());
        assert!(validate_index_pattern("   ").is_err());
        assert!(validate_index_pattern("a b").is_err());
    }

    #[test]
    fn test_snapshot_prefix() {
        assert!(validate_snapshot_prefix("daily").is_ok());
        assert!(validate_snapshot_prefix("graylog_weekly").is_ok());
        assert!(validate_snapshot_prefix("").is_err());
        assert!(validate_snapshot_prefix("Daily").is_err());
        assert!(validate_snapshot_prefix("-daily").is_err());
        assert!(validate_snapshot_prefix("a.b").is_err());
    }

    #[test]
    fn test_time_format() {
        assert!(validate_time_format("00:00").is_ok());
        assert!(validate_time_format("12:30").is_ok());
        assert!(validate_time_format("12:60").is_err());
        assert!(validate_time_format("12").is_err());
        assert!(validate_time_format("12:30:00").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new("repository", "cannot be empty");
        assert_eq!(err.to_string(), "repository: cannot be empty");
    }
}
