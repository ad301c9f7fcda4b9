//! Writer side of the result tree

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chatload_core::{Exchange, ResultSink, RunSummary, SinkError, Summary};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::layout::RunLayout;

/// Writes one run's results under its own directory
///
/// Exchange files are addressed by `(batch, credential id, sequence)`, so
/// concurrent conversations never write the same path and no locking is
/// needed. Summaries are written once, by whoever finishes the level.
#[derive(Debug, Clone)]
pub struct ResultStore {
    layout: RunLayout,
}

impl ResultStore {
    /// Create `<root>/test_<timestamp>` for a run started at `started_at`
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::AlreadyExists`] if another run already owns
    /// that directory; results are never merged into an existing run.
    pub async fn create(root: &Path, started_at: DateTime<Utc>) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| StoreError::io(root, e))?;

        let layout = RunLayout::for_run(root, started_at);
        match tokio::fs::create_dir(layout.run_dir()).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(layout.run_dir().to_path_buf()))
            }
            Err(e) => return Err(StoreError::io(layout.run_dir(), e)),
        }

        tracing::info!(run_dir = %layout.run_dir().display(), "Created run directory");
        Ok(Self { layout })
    }

    /// Open an existing run directory
    pub fn open(run_dir: &Path) -> Result<Self, StoreError> {
        if !run_dir.is_dir() {
            return Err(StoreError::NotARun(run_dir.to_path_buf()));
        }
        Ok(Self {
            layout: RunLayout::new(run_dir),
        })
    }

    /// Path scheme of this run
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// The run directory
    pub fn run_dir(&self) -> &Path {
        self.layout.run_dir()
    }

    /// Write `config.json`
    pub async fn write_config<T: Serialize + ?Sized>(&self, config: &T) -> Result<(), StoreError> {
        write_json(&self.layout.config(), config).await
    }

    /// Write the run-level `summary.json`
    pub async fn write_run_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        write_json(&self.layout.summary(), summary).await
    }

    /// Write `report.html`
    pub async fn write_report(&self, html: &str) -> Result<(), StoreError> {
        let path = self.layout.report();
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    // Readers only ever see a complete file or none
    let tmp = staging_path(path);
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

/// `.<name>.tmp` beside `path`; the leading dot keeps it out of scans
fn staging_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl ResultSink for ResultStore {
    async fn record(&self, exchange: &Exchange) -> Result<(), SinkError> {
        let path = self
            .layout
            .exchange(exchange.batch, &exchange.credential_id, exchange.sequence);
        write_json(&path, exchange).await?;

        tracing::trace!(path = %path.display(), "Recorded exchange");
        Ok(())
    }

    async fn record_summary(&self, summary: &Summary) -> Result<(), SinkError> {
        match summary {
            Summary::Conversation(s) => {
                let path = self.layout.conversation_summary(s.batch, &s.credential_id);
                write_json(&path, s).await?;
            }
            Summary::Batch(s) => {
                write_json(&self.layout.batch_summary(s.batch), s).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatload_core::{
        conversation_id, BatchSummary, ChatRequest, ConversationSummary, Outcome,
    };
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn exchange(batch: usize, cred: &str, sequence: usize) -> Exchange {
        Exchange {
            scenario: "default".to_string(),
            batch,
            credential_id: cred.to_string(),
            conversation_id: conversation_id(batch, cred),
            sequence,
            prompt: "hi".to_string(),
            model: "m1".to_string(),
            request: ChatRequest::new("m1", "sys", "hi"),
            started_at: Utc::now(),
            duration_secs: 0.5,
            outcome: Outcome::Success {
                response: serde_json::json!({"choices": []}),
            },
            response: None,
        }
    }

    #[tokio::test]
    async fn test_create_run_dir() {
        let root = TempDir::new().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let store = ResultStore::create(root.path(), started).await.unwrap();
        assert_eq!(store.run_dir(), root.path().join("test_20240102_030405"));
        assert!(store.run_dir().is_dir());
    }

    #[tokio::test]
    async fn test_create_existing_run_dir_fails() {
        let root = TempDir::new().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        ResultStore::create(root.path(), started).await.unwrap();
        let result = ResultStore::create(root.path(), started).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_record_exchange_path() {
        let root = TempDir::new().unwrap();
        let store = ResultStore::create(root.path(), Utc::now()).await.unwrap();

        let record = exchange(2, "key-7", 3);
        store.record(&record).await.unwrap();

        let path = store.run_dir().join("batch_2/conv_key-7/exchange_3.json");
        let parsed: Exchange =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, record);
    }

    #[tokio::test]
    async fn test_record_summaries() {
        let root = TempDir::new().unwrap();
        let store = ResultStore::create(root.path(), Utc::now()).await.unwrap();

        let conversation = ConversationSummary {
            scenario: "default".to_string(),
            batch: 1,
            credential_id: "k1".to_string(),
            conversation_id: conversation_id(1, "k1"),
            exchange_count: 3,
            success_count: 3,
            failure_count: 0,
            started_at: Utc::now(),
            total_duration_secs: 4.2,
        };
        store
            .record_summary(&Summary::Conversation(conversation))
            .await
            .unwrap();
        store
            .record_summary(&Summary::Batch(BatchSummary::from_conversations(
                "default",
                1,
                &[],
                4.3,
            )))
            .await
            .unwrap();

        let conv: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(store.run_dir().join("batch_1/conv_k1/summary.json"))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(conv["exchange_count"], 3);
        assert!(store.run_dir().join("batch_1/summary.json").exists());
    }

    #[tokio::test]
    async fn test_concurrent_writers_distinct_paths() {
        let root = TempDir::new().unwrap();
        let store = std::sync::Arc::new(ResultStore::create(root.path(), Utc::now()).await.unwrap());

        let mut handles = Vec::new();
        for cred in ["a", "b", "c", "d"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for k in 1..=3 {
                    store.record(&exchange(1, cred, k)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for cred in ["a", "b", "c", "d"] {
            for k in 1..=3 {
                assert!(store
                    .layout()
                    .exchange(1, cred, k)
                    .exists());
            }
        }
    }

    #[tokio::test]
    async fn test_write_config_and_report() {
        let root = TempDir::new().unwrap();
        let store = ResultStore::create(root.path(), Utc::now()).await.unwrap();

        store
            .write_config(&serde_json::json!({"concurrency": 5}))
            .await
            .unwrap();
        store.write_report("<html></html>").await.unwrap();
        store.write_run_summary(&RunSummary::default()).await.unwrap();

        assert!(store.run_dir().join("config.json").exists());
        assert!(store.run_dir().join("summary.json").exists());
        assert_eq!(
            std::fs::read_to_string(store.run_dir().join("report.html")).unwrap(),
            "<html></html>"
        );
    }

    #[tokio::test]
    async fn test_record_leaves_no_staging_file() {
        let root = TempDir::new().unwrap();
        let store = ResultStore::create(root.path(), Utc::now()).await.unwrap();

        store.record(&exchange(1, "a", 1)).await.unwrap();
        store.record(&exchange(1, "a", 1)).await.unwrap();

        let conv = store.layout().conversation_dir(1, "a");
        let names: Vec<String> = std::fs::read_dir(&conv)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["exchange_1.json".to_string()]);
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/run/batch_1/conv_a/exchange_3.json")),
            PathBuf::from("/run/batch_1/conv_a/.exchange_3.json.tmp")
        );
    }

    #[test]
    fn test_open_missing_dir() {
        let result = ResultStore::open(Path::new("/nonexistent/test_0"));
        assert!(matches!(result, Err(StoreError::NotARun(_))));
    }
}
