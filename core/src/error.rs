//! Error types for chatload-core
//!
//! Only [`ConfigError`] is fatal. Per-exchange failures are never errors in
//! this sense: they are captured as [`Outcome`](crate::Outcome) data and the
//! run proceeds to completion.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal setup/configuration errors
///
/// Any of these aborts a run before the first request is dispatched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The credential store file does not exist
    #[error("credential store not found: {}", .0.display())]
    MissingCredentialStore(PathBuf),

    /// The credential store could not be read or parsed
    #[error("invalid credential store: {0}")]
    InvalidCredentialStore(String),

    /// The credential store holds no usable credentials
    #[error("no credentials loaded")]
    EmptyCredentialSet,

    /// Two credentials share the same identifier
    #[error("duplicate credential id: {0}")]
    DuplicateCredential(String),

    /// A credential identifier cannot be used as a result path component
    #[error("invalid credential id {0:?}: ids must be non-empty and contain only [A-Za-z0-9._-]")]
    InvalidCredentialId(String),

    /// Invalid concurrency value
    #[error("invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid exchange count
    #[error("invalid exchange count: {0}")]
    InvalidExchangeCount(String),

    /// Invalid endpoint URL
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid per-exchange timeout
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid inter-exchange pacing window
    #[error("invalid pacing: {0}")]
    InvalidPacing(String),

    /// Malformed or unsatisfiable scenario
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// The prompt source is empty or unreadable
    #[error("prompt source unavailable: {0}")]
    PromptSource(String),

    /// A required builder field was not set
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
}

/// Errors raised while persisting exchanges and summaries
///
/// Sinks report these to the caller, which logs them and keeps running.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for configuration checks
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::MissingCredentialStore(PathBuf::from("keys.json"));
        assert_eq!(err.to_string(), "credential store not found: keys.json");

        let err = ConfigError::EmptyCredentialSet;
        assert_eq!(err.to_string(), "no credentials loaded");

        let err = ConfigError::Missing("transport");
        assert!(err.to_string().contains("transport"));
    }

    #[test]
    fn test_sink_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SinkError = io.into();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
