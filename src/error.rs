//! Error types for the crop dashboard
//!
//! Centralized error handling using snafu for ergonomic error definitions.
//!
//! Two layers exist: [`FetchError`] is the cloneable failure that travels inside
//! shared, cached results (every waiter on a deduplicated request sees the same
//! value), while [`Error`] is what crosses public API boundaries.

use snafu::Snafu;

/// Failure of a single fetcher call
///
/// Stored inside cached results, so it must be `Clone`. Timeouts and transient
/// failures are handled identically and only differ in how they are logged.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum FetchError {
    /// Network or backend failure
    #[snafu(display("Fetch failed: {message}"))]
    Transient { message: String },

    /// The call did not settle within its time budget
    #[snafu(display("{operation} timed out after {after_ms}ms"))]
    Timeout { operation: String, after_ms: u64 },
}

impl FetchError {
    /// Build a transient failure from any displayable error
    pub fn transient(message: impl std::fmt::Display) -> Self {
        FetchError::Transient {
            message: message.to_string(),
        }
    }

    /// Build a timeout failure for a named operation
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        FetchError::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Whether this failure was caused by a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Main error type for the application
#[derive(Debug, Snafu)]
pub enum Error {
    /// A fetcher call failed or timed out
    #[snafu(display("{source}"))]
    Fetch { source: FetchError },

    /// Action execution was requested for a crop without any sensor
    #[snafu(display("No sensors found for crop {crop_id}"))]
    NoSensors { crop_id: String },

    /// Invalid input or configuration
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// IO error (file operations, etc.)
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// JSON serialization/deserialization error
    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {source}"))]
    TomlDe { source: toml::de::Error },

    /// TOML serialization error
    #[snafu(display("TOML serialize error: {source}"))]
    TomlSe { source: toml::ser::Error },

    /// HTTP transport error
    #[snafu(display("HTTP error: {source}"))]
    Http { source: reqwest::Error },
}

impl From<FetchError> for Error {
    fn from(source: FetchError) -> Self {
        Error::Fetch { source }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json { source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe { source }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(source: toml::ser::Error) -> Self {
        Error::TomlSe { source }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error::Http { source }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::timeout("kpis", Duration::from_secs(5));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "kpis timed out after 5000ms");

        let err = FetchError::transient("connection refused");
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "Fetch failed: connection refused");
    }

    #[test]
    fn test_no_sensors_display() {
        let err = Error::NoSensors {
            crop_id: "c1".to_string(),
        };
        assert_eq!(err.to_string(), "No sensors found for crop c1");
    }
}
