//! JSON credential store

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatload_core::Credential;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CredentialStoreError;
use crate::lock::StoreLock;

const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of the store file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Identifier, used in result paths
    pub id: String,
    /// Secret sent in the `Authorization` header
    pub key: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Creation timestamp, as written
    #[serde(default)]
    pub created_at: String,
    /// Model bound to this key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl StoredKey {
    /// Convert into a runtime credential
    pub fn to_credential(&self) -> Credential {
        let credential = Credential::new(&self.id, &self.key);
        match &self.model {
            Some(model) => credential.with_model(model),
            None => credential,
        }
    }
}

/// A key to be appended; `created_at` is filled in on append
#[derive(Debug, Clone, Default)]
pub struct NewKey {
    /// Identifier
    pub id: String,
    /// Secret
    pub key: String,
    /// Free-form description
    pub description: String,
    /// Model bound to this key
    pub model: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    api_keys: Vec<StoredKey>,
}

/// The on-disk key file
///
/// Loading takes no lock. [`CredentialStore::append`] is the only writer: it
/// holds [`StoreLock`] across read-modify-write and replaces the file
/// atomically through a temporary file and rename.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Refer to the store at `path` (nothing is read yet)
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored key, in file order
    pub fn load(&self) -> Result<Vec<StoredKey>, CredentialStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CredentialStoreError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(CredentialStoreError::io(&self.path, e)),
        };

        let file: StoreFile =
            serde_json::from_str(&content).map_err(|source| CredentialStoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            store = %self.path.display(),
            keys = file.api_keys.len(),
            "Loaded credential store"
        );

        Ok(file.api_keys)
    }

    /// Load and validate keys as runtime credentials
    ///
    /// Rejects duplicate ids, ids that are not path-safe and empty secrets.
    pub fn credentials(&self) -> Result<Vec<Credential>, CredentialStoreError> {
        let keys = self.load()?;
        validate(&keys)?;
        Ok(keys.iter().map(StoredKey::to_credential).collect())
    }

    /// Append one key under the store lock
    ///
    /// A missing store file is created. Returns the entry as written.
    pub fn append(&self, new_key: NewKey) -> Result<StoredKey, CredentialStoreError> {
        let entry = StoredKey {
            id: new_key.id,
            key: new_key.key,
            description: new_key.description,
            created_at: Utc::now().to_rfc3339(),
            model: new_key.model,
        };
        check_entry(&entry)?;

        let _lock = StoreLock::acquire(&self.path, LOCK_TIMEOUT)?;

        let mut keys = match self.load() {
            Ok(keys) => keys,
            Err(CredentialStoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        if keys.iter().any(|k| k.id == entry.id) {
            return Err(CredentialStoreError::DuplicateId(entry.id));
        }
        keys.push(entry.clone());

        self.write(StoreFile { api_keys: keys })?;

        tracing::info!(store = %self.path.display(), id = %entry.id, "Added credential");
        Ok(entry)
    }

    fn write(&self, file: StoreFile) -> Result<(), CredentialStoreError> {
        let json = serde_json::to_string_pretty(&file)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CredentialStoreError::io(parent, e))?;
        }
        fs::write(&tmp, json).map_err(|e| CredentialStoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CredentialStoreError::io(&self.path, e))?;
        Ok(())
    }
}

fn check_entry(key: &StoredKey) -> Result<(), CredentialStoreError> {
    if !key.to_credential().has_path_safe_id() {
        return Err(CredentialStoreError::InvalidId(key.id.clone()));
    }
    if key.key.is_empty() {
        return Err(CredentialStoreError::EmptyKey(key.id.clone()));
    }
    Ok(())
}

fn validate(keys: &[StoredKey]) -> Result<(), CredentialStoreError> {
    let mut seen = HashSet::new();
    for key in keys {
        check_entry(key)?;
        if !seen.insert(key.id.as_str()) {
            return Err(CredentialStoreError::DuplicateId(key.id.clone()));
        }
    }
    Ok(())
}
