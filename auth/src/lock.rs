//! Advisory lock guarding store updates

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::CredentialStoreError;

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Holds an exclusive advisory lock on `<store>.lock` for as long as it lives
///
/// The lock belongs to the open file, so the OS drops it when the guard is
/// dropped, when a panic unwinds past it, and when the holding process dies.
/// A lock file left behind by a killed writer is just an unlocked file and
/// is reused. The file itself is never removed: deleting it would let two
/// writers lock different inodes under the same path.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Lock file path for a store
    pub fn path_for(store: &Path) -> PathBuf {
        let mut name = store.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock, retrying until `timeout` elapses
    ///
    /// Blocks the calling thread; async callers should go through
    /// `spawn_blocking`.
    pub fn acquire(store: &Path, timeout: Duration) -> Result<Self, CredentialStoreError> {
        let path = Self::path_for(store);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CredentialStoreError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| CredentialStoreError::io(&path, e))?;

        let contended = fs2::lock_contended_error();
        let deadline = Instant::now() + timeout;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    tracing::trace!(lock = %path.display(), "Acquired store lock");
                    return Ok(Self { file, path });
                }
                Err(e) if e.raw_os_error() == contended.raw_os_error() => {
                    if Instant::now() >= deadline {
                        return Err(CredentialStoreError::LockTimeout(path));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(CredentialStoreError::io(&path, e)),
            }
        }
    }

    /// Path of the held lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %e, "Failed to release store lock");
        }
    }
}
