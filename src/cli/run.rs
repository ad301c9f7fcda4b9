//! `chatload run`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chatload_auth::{CredentialPool, CredentialStore};
use chatload_core::{
    aggregate, planned_exchanges, BatchSchedulerBuilder, ConversationRunnerBuilder, Dispatcher,
    Exchange, Pacing, PromptSource, ResultSink, RunConfig, RunOutcome, RunSummary, Scenario,
    DEFAULT_SYSTEM_PROMPT,
};
use chatload_report::{ReportMeta, ReportRenderer, Severity};
use chatload_samplers::PromptSampler;
use chatload_storage::{ResultStore, ResultTree};
use chatload_vendors::{HttpConfig, HttpTransport};
use chrono::Utc;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::rule;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Chat-completion endpoint URL
    #[arg(
        short,
        long,
        env = "CHATLOAD_ENDPOINT",
        default_value = "http://localhost:8000/v1/chat/completions"
    )]
    pub endpoint: String,

    /// Model used for credentials without a bound model
    #[arg(short, long, env = "CHATLOAD_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// System message sent ahead of every prompt
    #[arg(long, env = "CHATLOAD_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Maximum conversations running at once (batch size)
    #[arg(short, long, env = "CHATLOAD_CONCURRENCY", default_value = "5")]
    pub concurrency: usize,

    /// Number of credentials drawn from the store (default: all)
    #[arg(short, long, env = "CHATLOAD_WORKERS")]
    pub workers: Option<usize>,

    /// Exchanges per conversation
    #[arg(short = 'n', long, env = "CHATLOAD_EXCHANGES", default_value = "3")]
    pub exchanges: usize,

    /// Network timeout per exchange, in seconds
    #[arg(short, long, env = "CHATLOAD_TIMEOUT", default_value = "60")]
    pub timeout: u64,

    /// TCP connect timeout, in seconds (default: bounded only by --timeout)
    #[arg(long, env = "CHATLOAD_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// Lower bound of the pause between exchanges, in milliseconds
    #[arg(long, env = "CHATLOAD_PACING_MIN_MS", default_value = "1000")]
    pub pacing_min_ms: u64,

    /// Upper bound of the pause between exchanges, in milliseconds
    #[arg(long, env = "CHATLOAD_PACING_MAX_MS", default_value = "3000")]
    pub pacing_max_ms: u64,

    /// Prompt file, one prompt per line (default: built-in prompts)
    #[arg(short, long, env = "CHATLOAD_PROMPTS")]
    pub prompts: Option<PathBuf>,

    /// Directory under which run directories are created
    #[arg(short, long, env = "CHATLOAD_RESULTS_DIR", default_value = "results")]
    pub results_dir: PathBuf,

    /// Scenario as name:credentials:exchanges:concurrency (repeatable;
    /// credentials may be "all")
    #[arg(long = "scenario")]
    pub scenarios: Vec<Scenario>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    /// Build the run configuration from flags
    pub fn to_config(&self, verbose: bool) -> RunConfig {
        RunConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            concurrency: self.concurrency,
            workers: self.workers,
            exchanges: self.exchanges,
            timeout_secs: self.timeout,
            connect_timeout_secs: self.connect_timeout,
            pacing: Pacing::new(self.pacing_min_ms, self.pacing_max_ms),
            verbose,
            scenarios: self.scenarios.clone(),
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct Completed {
    pub run_dir: PathBuf,
    pub summary: RunSummary,
}

pub async fn execute(args: &RunArgs, key_store: &Path, verbose: bool) -> Result<Completed> {
    // 1. Configuration
    let config = args.to_config(verbose);
    config.validate()?;
    let scenarios = config.effective_scenarios();

    // 2. Credentials
    let pool = CredentialPool::from_store(&CredentialStore::open(key_store))?;
    let credentials = pool.take(config.workers)?;
    chatload_core::BatchScheduler::check(&scenarios, credentials)?;

    // 3. Prompts
    let sampler = match &args.prompts {
        Some(path) => PromptSampler::from_file(path)?,
        None => PromptSampler::builtin(),
    };

    tracing::info!(
        endpoint = %config.endpoint,
        credentials = credentials.len(),
        prompts = sampler.len(),
        scenarios = scenarios.len(),
        "Loaded run configuration"
    );

    print_banner(&config, &scenarios, credentials.len(), sampler.name());

    // 4. Result tree
    let store = Arc::new(
        ResultStore::create(&args.results_dir, Utc::now())
            .await
            .context("Failed to create run directory")?,
    );
    store
        .write_config(&config)
        .await
        .context("Failed to write config.json")?;

    // 5. Pipeline
    let peak = scenarios.iter().map(|s| s.concurrency).max().unwrap_or(1);
    let http = HttpConfig::for_concurrency(peak).with_connect_timeout(config.connect_timeout());
    let transport =
        HttpTransport::new(config.endpoint.clone(), &http).context("Failed to build HTTP client")?;
    let dispatcher =
        Arc::new(Dispatcher::new(Arc::new(transport)).with_system_prompt(&config.system_prompt));

    let progress = (!args.no_progress && !verbose)
        .then(|| progress_bar(planned_exchanges(&scenarios, credentials.len())));

    let sink: Arc<dyn ResultSink> = store.clone();
    let prompts: Arc<dyn PromptSource> = Arc::new(sampler);
    let runner = ConversationRunnerBuilder::new()
        .dispatcher(dispatcher)
        .prompts(prompts)
        .sink(sink.clone())
        .pacing(config.pacing)
        .timeout(config.timeout())
        .default_model(&config.model)
        .verbose(config.verbose)
        .progress(progress.clone())
        .build()?;
    let scheduler = BatchSchedulerBuilder::new()
        .runner(Arc::new(runner))
        .sink(sink)
        .progress(progress.clone())
        .build()?;

    // 6. Run
    let outcome = scheduler.run(&scenarios, credentials).await?;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    // 7. Aggregate
    let summary = summarize(store.run_dir(), &outcome);

    if let Err(e) = store.write_run_summary(&summary).await {
        tracing::error!(error = %e, "Failed to write run summary");
    }

    let meta = ReportMeta::new(run_name(store.run_dir())).with_endpoint(&config.endpoint);
    let html = ReportRenderer::new().render(&summary, &meta);
    if let Err(e) = store.write_report(&html).await {
        tracing::error!(error = %e, "Failed to write report");
    }

    print_summary(&summary, store.run_dir());

    Ok(Completed {
        run_dir: store.run_dir().to_path_buf(),
        summary,
    })
}

/// Aggregate what landed on disk, falling back to the in-memory records
/// when the tree cannot be read or is missing exchanges
fn summarize(run_dir: &Path, outcome: &RunOutcome) -> RunSummary {
    let executed = outcome.exchange_count();
    match ResultTree::scan(run_dir) {
        Ok(records) if records.len() == executed => return aggregate(&records),
        Ok(records) => tracing::warn!(
            recorded = records.len(),
            executed,
            "Some exchanges were not persisted, summarizing from memory"
        ),
        Err(e) => tracing::error!(
            error = %e,
            "Failed to scan result tree, summarizing from memory"
        ),
    }

    let records: Vec<Exchange> = outcome.exchanges().cloned().collect();
    aggregate(&records)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

pub(super) fn run_name(run_dir: &Path) -> String {
    run_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| run_dir.display().to_string())
}

fn print_banner(config: &RunConfig, scenarios: &[Scenario], credentials: usize, prompts: &str) {
    println!();
    rule();
    println!("   chatload - Conversation Load Test");
    rule();
    println!();
    println!("Configuration:");
    println!("  Endpoint:     {}", config.endpoint);
    println!("  Model:        {}", config.model);
    println!("  Credentials:  {}", credentials);
    println!("  Prompts:      {}", prompts);
    println!("  Timeout:      {}s", config.timeout_secs);
    println!(
        "  Pacing:       {}-{} ms",
        config.pacing.min_ms, config.pacing.max_ms
    );
    for scenario in scenarios {
        println!(
            "  Scenario:     {} (credentials: {}, exchanges: {}, concurrency: {})",
            scenario.name,
            scenario
                .credentials
                .map_or_else(|| "all".to_string(), |n| n.to_string()),
            scenario.exchanges,
            scenario.concurrency
        );
    }
    rule();
    println!();
}

pub(super) fn print_summary(summary: &RunSummary, run_dir: &Path) {
    let overall = &summary.overall;
    let severity = Severity::from_success_rate(overall.success_rate);

    println!();
    rule();
    println!("   Results: {}", severity);
    rule();
    println!();
    println!("  Exchanges:    {}", overall.total);
    println!(
        "  Successful:   {} ({:.1}%)",
        overall.succeeded,
        overall.success_rate * 100.0
    );
    println!("  Failed:       {}", overall.failed);
    println!("  Duration:     {:.2}s", overall.duration_secs);
    println!("  Throughput:   {:.2} exchanges/s", overall.throughput);
    println!(
        "  Latency:      p50 {:.3}s, p95 {:.3}s, max {:.3}s",
        overall.latency.p50, overall.latency.p95, overall.latency.max
    );

    if !summary.error_patterns.is_empty() {
        println!();
        println!("  Top errors:");
        for pattern in summary.error_patterns.iter().take(5) {
            println!(
                "    {:>5} x [{}] {}",
                pattern.count, pattern.model, pattern.message
            );
        }
    }

    println!();
    println!("  Results:      {}", run_dir.display());
    println!("  Report:       {}", run_dir.join("report.html").display());
    rule();
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatload_auth::NewKey;
    use chatload_core::ConfigError;
    use clap::Parser;
    use tempfile::TempDir;

    fn args(results_dir: &Path, endpoint: &str) -> RunArgs {
        let cli = super::super::Cli::try_parse_from([
            "chatload",
            "run",
            "--endpoint",
            endpoint,
            "--pacing-min-ms",
            "0",
            "--pacing-max-ms",
            "0",
            "--timeout",
            "2",
            "--no-progress",
            "-c",
            "2",
            "-n",
            "2",
            "--results-dir",
            results_dir.to_str().unwrap(),
        ])
        .unwrap();
        match cli.command {
            super::super::Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    fn key_store(dir: &Path, count: usize) -> PathBuf {
        let path = dir.join("keys.json");
        let store = CredentialStore::open(&path);
        for i in 1..=count {
            store
                .append(NewKey {
                    id: format!("k{}", i),
                    key: format!("sk-{}", i),
                    ..Default::default()
                })
                .unwrap();
        }
        path
    }

    async fn unreachable_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/v1/chat/completions", addr)
    }

    #[tokio::test]
    async fn test_run_against_unreachable_endpoint_completes() {
        let dir = TempDir::new().unwrap();
        let keys = key_store(dir.path(), 3);
        let results = dir.path().join("results");
        let endpoint = unreachable_endpoint().await;

        let completed = execute(&args(&results, &endpoint), &keys, false)
            .await
            .unwrap();

        // 3 credentials at concurrency 2 -> two batches, 2 exchanges each
        assert_eq!(completed.summary.overall.total, 6);
        assert_eq!(completed.summary.overall.failed, 6);
        assert_eq!(completed.summary.batches.len(), 2);
        assert_eq!(completed.summary.error_patterns.len(), 1);
        assert_eq!(completed.summary.error_patterns[0].count, 6);

        let run_dir = &completed.run_dir;
        assert!(run_name(run_dir).starts_with("test_"));
        assert!(run_dir.join("config.json").exists());
        assert!(run_dir.join("summary.json").exists());
        assert!(run_dir.join("report.html").exists());
        assert!(run_dir.join("batch_1/summary.json").exists());
        assert!(run_dir.join("batch_1/conv_k1/exchange_2.json").exists());
        assert!(run_dir.join("batch_1/conv_k2/summary.json").exists());
        assert!(run_dir.join("batch_2/conv_k3/exchange_1.json").exists());

        let record: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(run_dir.join("batch_1/conv_k1/exchange_1.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record["outcome"]["code"], 7);
    }

    fn finished_outcome(sequences: usize) -> RunOutcome {
        let started_at = Utc::now();
        let exchanges: Vec<Exchange> = (1..=sequences)
            .map(|sequence| Exchange {
                scenario: "default".to_string(),
                batch: 1,
                credential_id: "k1".to_string(),
                conversation_id: chatload_core::conversation_id(1, "k1"),
                sequence,
                prompt: "hi".to_string(),
                model: "m1".to_string(),
                request: chatload_core::ChatRequest::new("m1", "sys", "hi"),
                started_at,
                duration_secs: 0.25,
                outcome: chatload_core::Outcome::Success {
                    response: serde_json::json!({"choices": [{"index": 0}]}),
                },
                response: None,
            })
            .collect();
        let conversation = chatload_core::Conversation {
            summary: chatload_core::ConversationSummary {
                scenario: "default".to_string(),
                batch: 1,
                credential_id: "k1".to_string(),
                conversation_id: chatload_core::conversation_id(1, "k1"),
                exchange_count: sequences,
                success_count: sequences,
                failure_count: 0,
                started_at,
                total_duration_secs: 0.25 * sequences as f64,
            },
            exchanges,
        };
        let conversations = vec![conversation];
        let summary =
            chatload_core::BatchSummary::from_conversations("default", 1, &conversations, 1.0);
        RunOutcome {
            started_at,
            finished_at: started_at,
            batches: vec![chatload_core::Batch {
                credential_ids: vec!["k1".to_string()],
                conversations,
                summary,
            }],
        }
    }

    #[tokio::test]
    async fn test_summary_survives_truncated_record() {
        let root = TempDir::new().unwrap();
        let store = ResultStore::create(root.path(), Utc::now()).await.unwrap();
        let outcome = finished_outcome(6);

        for exchange in outcome.exchanges().take(5) {
            store.record(exchange).await.unwrap();
        }
        let conv = store.layout().conversation_dir(1, "k1");
        std::fs::write(conv.join("exchange_6.json"), "{\"scenario\": \"def").unwrap();

        let summary = summarize(store.run_dir(), &outcome);
        assert_eq!(summary.overall.total, 6);
        assert_eq!(summary.overall.succeeded, 6);
    }

    #[test]
    fn test_summary_without_result_tree() {
        let dir = TempDir::new().unwrap();
        let summary = summarize(&dir.path().join("gone"), &finished_outcome(3));
        assert_eq!(summary.overall.total, 3);
        assert_eq!(summary.conversations.len(), 1);
    }

    #[tokio::test]
    async fn test_run_missing_key_store() {
        let dir = TempDir::new().unwrap();
        let endpoint = unreachable_endpoint().await;
        let result = execute(
            &args(&dir.path().join("results"), &endpoint),
            &dir.path().join("missing.json"),
            false,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingCredentialStore(_))
        ));
        assert!(!dir.path().join("results").exists());
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let keys = key_store(dir.path(), 1);
        let mut run_args = args(&dir.path().join("results"), "ftp://nowhere");
        run_args.concurrency = 1;

        let err = execute(&run_args, &keys, false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_run_rejects_oversized_worker_count() {
        let dir = TempDir::new().unwrap();
        let keys = key_store(dir.path(), 2);
        let endpoint = unreachable_endpoint().await;
        let mut run_args = args(&dir.path().join("results"), &endpoint);
        run_args.workers = Some(5);

        assert!(execute(&run_args, &keys, false).await.is_err());
        assert!(!dir.path().join("results").exists());
    }
}
