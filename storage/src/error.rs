//! Storage errors

use std::path::PathBuf;

use chatload_core::SinkError;
use thiserror::Error;

/// Errors raised while creating, writing or scanning a run directory
#[derive(Debug, Error)]
pub enum StoreError {
    /// The run directory is already taken by another run
    #[error("run directory already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The directory is not a run directory
    #[error("not a run directory: {}", .0.display())]
    NotARun(PathBuf),

    /// Filesystem error
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for SinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io { source, .. } => SinkError::Io(source),
            StoreError::Serialize(e) | StoreError::Parse { source: e, .. } => {
                SinkError::Serialize(e)
            }
            other => SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                other.to_string(),
            )),
        }
    }
}
