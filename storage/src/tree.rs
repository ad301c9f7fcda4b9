//! Reader side of the result tree

use std::fs;
use std::path::{Path, PathBuf};

use chatload_core::Exchange;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Reads the records of a finished (or interrupted) run
pub struct ResultTree;

impl ResultTree {
    /// Every exchange under `run_dir`, ordered by batch, conversation and
    /// sequence
    ///
    /// Only `batch_*/conv_*/exchange_*.json` files are read; summaries and
    /// unrelated files are ignored. A record that does not decode (a run
    /// killed mid-write) is logged and skipped.
    pub fn scan(run_dir: &Path) -> Result<Vec<Exchange>, StoreError> {
        let mut exchanges: Vec<Exchange> = Vec::new();
        let mut skipped = 0usize;
        for conversation_dir in conversation_dirs(run_dir)? {
            for path in entries_with_prefix(&conversation_dir, "exchange_")? {
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match read_json(&path) {
                    Ok(exchange) => exchanges.push(exchange),
                    Err(e @ StoreError::Parse { .. }) => {
                        tracing::warn!(error = %e, "Skipping unreadable exchange record");
                        skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        exchanges.sort_by(|a, b| {
            a.batch
                .cmp(&b.batch)
                .then_with(|| a.conversation_id.cmp(&b.conversation_id))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });

        tracing::debug!(
            run_dir = %run_dir.display(),
            exchanges = exchanges.len(),
            skipped,
            "Scanned result tree"
        );
        Ok(exchanges)
    }

    /// Decode `config.json` of a run
    pub fn config<T: DeserializeOwned>(run_dir: &Path) -> Result<T, StoreError> {
        read_json(&run_dir.join("config.json"))
    }
}

fn conversation_dirs(run_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !run_dir.is_dir() {
        return Err(StoreError::NotARun(run_dir.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for batch_dir in entries_with_prefix(run_dir, "batch_")? {
        if !batch_dir.is_dir() {
            continue;
        }
        for conversation_dir in entries_with_prefix(&batch_dir, "conv_")? {
            if conversation_dir.is_dir() {
                dirs.push(conversation_dir);
            }
        }
    }
    Ok(dirs)
}

/// Entries of `dir` whose file name starts with `prefix`, sorted by name
fn entries_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, StoreError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
