//! The validated set of credentials a run draws from

use std::collections::HashSet;

use chatload_core::{ConfigError, ConfigResult, Credential};

use crate::store::CredentialStore;

/// Ordered, validated credentials
///
/// Every id is unique and path-safe, and the pool is never empty.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Load the pool from a store
    ///
    /// # Errors
    ///
    /// Any store problem is reported as the matching [`ConfigError`].
    pub fn from_store(store: &CredentialStore) -> ConfigResult<Self> {
        let credentials = store.credentials()?;
        let pool = Self::from_credentials(credentials)?;
        tracing::info!(
            store = %store.path().display(),
            credentials = pool.len(),
            "Credential pool ready"
        );
        Ok(pool)
    }

    /// Build a pool from credentials already in memory
    pub fn from_credentials(credentials: Vec<Credential>) -> ConfigResult<Self> {
        if credentials.is_empty() {
            return Err(ConfigError::EmptyCredentialSet);
        }

        let mut seen = HashSet::new();
        for credential in &credentials {
            if !credential.has_path_safe_id() {
                return Err(ConfigError::InvalidCredentialId(credential.id().to_string()));
            }
            if !seen.insert(credential.id()) {
                return Err(ConfigError::DuplicateCredential(credential.id().to_string()));
            }
        }

        Ok(Self { credentials })
    }

    /// Every credential, in store order
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// The first `count` credentials, or all of them for `None`
    pub fn take(&self, count: Option<usize>) -> ConfigResult<&[Credential]> {
        match count {
            None => Ok(&self.credentials),
            Some(0) => Err(ConfigError::InvalidConcurrency(
                "worker count must be at least 1".into(),
            )),
            Some(n) if n > self.credentials.len() => Err(ConfigError::InvalidConcurrency(format!(
                "worker count {} exceeds the {} credentials loaded",
                n,
                self.credentials.len()
            ))),
            Some(n) => Ok(&self.credentials[..n]),
        }
    }

    /// Number of credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false: an empty pool cannot be built
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
