//! Credential store errors

use std::path::PathBuf;

use chatload_core::ConfigError;
use thiserror::Error;

/// Errors raised while reading or updating the credential store
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The store file does not exist
    #[error("credential store not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Filesystem error
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The store is not valid JSON of the expected shape
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Store file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The store could not be serialized
    #[error("failed to serialize credential store: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A key with this id already exists
    #[error("duplicate credential id: {0}")]
    DuplicateId(String),

    /// The id cannot be used as a path component
    #[error("invalid credential id {0:?}: ids must be non-empty and contain only [A-Za-z0-9._-]")]
    InvalidId(String),

    /// A key has an empty secret
    #[error("credential {0} has an empty key")]
    EmptyKey(String),

    /// Another process held the lock for too long
    #[error("timed out waiting for lock {}", .0.display())]
    LockTimeout(PathBuf),
}

impl CredentialStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<CredentialStoreError> for ConfigError {
    fn from(err: CredentialStoreError) -> Self {
        match err {
            CredentialStoreError::NotFound(path) => ConfigError::MissingCredentialStore(path),
            CredentialStoreError::DuplicateId(id) => ConfigError::DuplicateCredential(id),
            CredentialStoreError::InvalidId(id) => ConfigError::InvalidCredentialId(id),
            other => ConfigError::InvalidCredentialStore(other.to_string()),
        }
    }
}
