//! Credential management
//!
//! This crate provides:
//!
//! - [`CredentialStore`]: the JSON key file (`{"api_keys": [...]}`), with a
//!   lock-free load path and a single locked append
//! - [`CredentialPool`]: the validated, ordered set of credentials a run uses

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod lock;
mod pool;
mod store;

pub use error::CredentialStoreError;
pub use lock::StoreLock;
pub use pool::CredentialPool;
pub use store::{CredentialStore, NewKey, StoredKey};
