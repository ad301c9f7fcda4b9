//! `chatload report`

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatload_core::{aggregate, RunConfig, RunSummary};
use chatload_report::{ReportMeta, ReportRenderer};
use chatload_storage::{ResultStore, ResultTree};
use clap::Args;

use super::run::{print_summary, run_name};

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Run directory (results/test_<timestamp>)
    pub run_dir: PathBuf,
}

/// Re-aggregate the exchanges under a run directory and rewrite its
/// `summary.json` and `report.html`
pub async fn execute(args: &ReportArgs) -> Result<RunSummary> {
    let store = ResultStore::open(&args.run_dir)?;
    let records = ResultTree::scan(store.run_dir())
        .with_context(|| format!("Failed to scan {}", args.run_dir.display()))?;
    let summary = aggregate(&records);

    tracing::info!(
        run_dir = %args.run_dir.display(),
        exchanges = records.len(),
        patterns = summary.error_patterns.len(),
        "Re-aggregated run"
    );

    let mut meta = ReportMeta::new(run_name(store.run_dir()));
    match ResultTree::config::<RunConfig>(store.run_dir()) {
        Ok(config) => meta = meta.with_endpoint(config.endpoint),
        Err(e) => tracing::warn!(error = %e, "Run config unavailable"),
    }
    let html = ReportRenderer::new().render(&summary, &meta);

    store
        .write_run_summary(&summary)
        .await
        .context("Failed to write summary.json")?;
    store
        .write_report(&html)
        .await
        .context("Failed to write report.html")?;

    print_summary(&summary, store.run_dir());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatload_core::{conversation_id, ChatRequest, Exchange, Outcome, ResultSink};
    use chrono::Utc;
    use tempfile::TempDir;

    fn exchange(cred: &str, sequence: usize, outcome: Outcome) -> Exchange {
        Exchange {
            scenario: "default".to_string(),
            batch: 1,
            credential_id: cred.to_string(),
            conversation_id: conversation_id(1, cred),
            sequence,
            prompt: "hi".to_string(),
            model: "m1".to_string(),
            request: ChatRequest::new("m1", "sys", "hi"),
            started_at: Utc::now(),
            duration_secs: 0.25,
            outcome,
            response: None,
        }
    }

    #[tokio::test]
    async fn test_report_regenerates_summary_and_html() {
        let root = TempDir::new().unwrap();
        let store = ResultStore::create(root.path(), Utc::now()).await.unwrap();
        store
            .write_config(&RunConfig::new("http://localhost:9000/v1/chat/completions"))
            .await
            .unwrap();
        store
            .record(&exchange("k1", 1, Outcome::Success {
                response: serde_json::json!({"choices": []}),
            }))
            .await
            .unwrap();
        store
            .record(&exchange("k1", 2, Outcome::ApplicationError {
                message: "rate limited".to_string(),
            }))
            .await
            .unwrap();

        let args = ReportArgs {
            run_dir: store.run_dir().to_path_buf(),
        };
        let first = execute(&args).await.unwrap();
        let first_bytes = std::fs::read(store.run_dir().join("summary.json")).unwrap();
        let second = execute(&args).await.unwrap();
        let second_bytes = std::fs::read(store.run_dir().join("summary.json")).unwrap();

        assert_eq!(first.overall.total, 2);
        assert_eq!(first.overall.failed, 1);
        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);

        let html = std::fs::read_to_string(store.run_dir().join("report.html")).unwrap();
        assert!(html.contains("localhost:9000"));
        assert!(html.contains("1 occurrence"));
    }

    #[tokio::test]
    async fn test_report_missing_run_dir() {
        let args = ReportArgs {
            run_dir: PathBuf::from("/nonexistent/test_0"),
        };
        assert!(execute(&args).await.is_err());
    }
}
