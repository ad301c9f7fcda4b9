//! Path scheme of a run directory

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Prefix of every run directory name
pub const RUN_DIR_PREFIX: &str = "test_";

/// `strftime` format of the run directory timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const CONFIG_FILE: &str = "config.json";
const SUMMARY_FILE: &str = "summary.json";
const REPORT_FILE: &str = "report.html";

/// Paths inside one run directory
///
/// Batches and exchanges are numbered from 1. Each exchange path is unique
/// per `(batch, credential id, sequence)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    run_dir: PathBuf,
}

impl RunLayout {
    /// Layout rooted at an existing run directory
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    /// Layout for a run started at `started_at` under `root`
    pub fn for_run(root: &Path, started_at: DateTime<Utc>) -> Self {
        Self::new(root.join(format!(
            "{}{}",
            RUN_DIR_PREFIX,
            started_at.format(TIMESTAMP_FORMAT)
        )))
    }

    /// The run directory
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// `config.json`
    pub fn config(&self) -> PathBuf {
        self.run_dir.join(CONFIG_FILE)
    }

    /// Run-level `summary.json`
    pub fn summary(&self) -> PathBuf {
        self.run_dir.join(SUMMARY_FILE)
    }

    /// `report.html`
    pub fn report(&self) -> PathBuf {
        self.run_dir.join(REPORT_FILE)
    }

    /// `batch_<n>/`
    pub fn batch_dir(&self, batch: usize) -> PathBuf {
        self.run_dir.join(format!("batch_{}", batch))
    }

    /// `batch_<n>/summary.json`
    pub fn batch_summary(&self, batch: usize) -> PathBuf {
        self.batch_dir(batch).join(SUMMARY_FILE)
    }

    /// `batch_<n>/conv_<id>/`
    pub fn conversation_dir(&self, batch: usize, credential_id: &str) -> PathBuf {
        self.batch_dir(batch).join(format!("conv_{}", credential_id))
    }

    /// `batch_<n>/conv_<id>/summary.json`
    pub fn conversation_summary(&self, batch: usize, credential_id: &str) -> PathBuf {
        self.conversation_dir(batch, credential_id).join(SUMMARY_FILE)
    }

    /// `batch_<n>/conv_<id>/exchange_<k>.json`
    pub fn exchange(&self, batch: usize, credential_id: &str, sequence: usize) -> PathBuf {
        self.conversation_dir(batch, credential_id)
            .join(format!("exchange_{}.json", sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_dir_name() {
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let layout = RunLayout::for_run(Path::new("results"), started);
        assert_eq!(layout.run_dir(), Path::new("results/test_20240309_140507"));
    }

    #[test]
    fn test_paths() {
        let layout = RunLayout::new("/r/test_1");
        assert_eq!(layout.config(), PathBuf::from("/r/test_1/config.json"));
        assert_eq!(layout.summary(), PathBuf::from("/r/test_1/summary.json"));
        assert_eq!(layout.report(), PathBuf::from("/r/test_1/report.html"));
        assert_eq!(
            layout.batch_summary(2),
            PathBuf::from("/r/test_1/batch_2/summary.json")
        );
        assert_eq!(
            layout.exchange(1, "key-3", 4),
            PathBuf::from("/r/test_1/batch_1/conv_key-3/exchange_4.json")
        );
        assert_eq!(
            layout.conversation_summary(1, "key-3"),
            PathBuf::from("/r/test_1/batch_1/conv_key-3/summary.json")
        );
    }
}
