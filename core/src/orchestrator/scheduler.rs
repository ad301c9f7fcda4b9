//! Batch scheduling with a join barrier between batches

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use indicatif::ProgressBar;

use crate::config::Scenario;
use crate::credential::Credential;
use crate::error::{ConfigError, ConfigResult};
use crate::exchange::{Batch, BatchSummary, RunOutcome};
use crate::traits::{ResultSink, Summary};
use crate::worker::ConversationRunner;

use super::pool::WorkerPool;

/// Number of batches needed for `credentials` at `concurrency` per batch
pub fn batch_count(credentials: usize, concurrency: usize) -> usize {
    credentials.div_ceil(concurrency.max(1))
}

/// Total exchanges a run of `scenarios` over `available` credentials will make
pub fn planned_exchanges(scenarios: &[Scenario], available: usize) -> u64 {
    scenarios
        .iter()
        .map(|s| (s.credentials.unwrap_or(available).min(available) * s.exchanges) as u64)
        .sum()
}

/// Runs conversations in consecutive, concurrency-bounded batches
///
/// Batch *n+1* starts only after every conversation of batch *n* has
/// finished. Within a batch, conversations run concurrently with no ordering
/// between them. Batch indices are 1-based and keep counting across
/// scenarios so every conversation id in a run is unique.
pub struct BatchScheduler {
    runner: Arc<ConversationRunner>,
    sink: Arc<dyn ResultSink>,
    progress: Option<ProgressBar>,
}

impl BatchScheduler {
    /// Create a new scheduler
    ///
    /// Use `BatchSchedulerBuilder` for a more ergonomic construction.
    pub fn new(
        runner: Arc<ConversationRunner>,
        sink: Arc<dyn ResultSink>,
        progress: Option<ProgressBar>,
    ) -> Self {
        Self {
            runner,
            sink,
            progress,
        }
    }

    /// Check that `scenarios` can run against `credentials`
    pub fn check(scenarios: &[Scenario], credentials: &[Credential]) -> ConfigResult<()> {
        if credentials.is_empty() {
            return Err(ConfigError::EmptyCredentialSet);
        }
        if scenarios.is_empty() {
            return Err(ConfigError::InvalidScenario("no scenarios to run".into()));
        }
        for scenario in scenarios {
            scenario.validate()?;
            if let Some(n) = scenario.credentials {
                if n > credentials.len() {
                    return Err(ConfigError::InvalidScenario(format!(
                        "{}: needs {} credentials, only {} loaded",
                        scenario.name,
                        n,
                        credentials.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Execute every scenario in order
    ///
    /// Each scenario draws its credentials from the front of `credentials`.
    /// Failed exchanges never abort the run; only a configuration problem
    /// detected before the first dispatch does.
    pub async fn run(
        &self,
        scenarios: &[Scenario],
        credentials: &[Credential],
    ) -> ConfigResult<RunOutcome> {
        Self::check(scenarios, credentials)?;

        let started_at = Utc::now();
        let start = Instant::now();
        let mut batches = Vec::new();
        let mut next_batch = 1;

        tracing::info!(
            scenarios = scenarios.len(),
            credentials = credentials.len(),
            "Starting run"
        );

        for scenario in scenarios {
            let selected = &credentials[..scenario.credentials.unwrap_or(credentials.len())];

            tracing::info!(
                scenario = %scenario.name,
                credentials = selected.len(),
                exchanges = scenario.exchanges,
                concurrency = scenario.concurrency,
                batches = batch_count(selected.len(), scenario.concurrency),
                "Starting scenario"
            );

            for chunk in selected.chunks(scenario.concurrency) {
                batches.push(self.run_batch(scenario, next_batch, chunk).await);
                next_batch += 1;
            }
        }

        let outcome = RunOutcome {
            started_at,
            finished_at: Utc::now(),
            batches,
        };

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            batches = outcome.batches.len(),
            exchanges = outcome.exchange_count(),
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            "Run completed"
        );

        Ok(outcome)
    }

    async fn run_batch(&self, scenario: &Scenario, batch: usize, chunk: &[Credential]) -> Batch {
        if let Some(ref progress) = self.progress {
            progress.set_message(format!("{} batch {}", scenario.name, batch));
        }

        tracing::debug!(
            scenario = %scenario.name,
            batch,
            conversations = chunk.len(),
            "Submitting batch"
        );

        let start = Instant::now();
        let mut pool = WorkerPool::new(scenario.concurrency);

        for credential in chunk {
            let runner = Arc::clone(&self.runner);
            let credential = credential.clone();
            let name = scenario.name.clone();
            let exchanges = scenario.exchanges;
            pool.submit(async move { runner.run(&name, batch, &credential, exchanges).await });
        }

        let conversations = pool.await_batch().await;
        let summary = BatchSummary::from_conversations(
            &scenario.name,
            batch,
            &conversations,
            start.elapsed().as_secs_f64(),
        );

        if conversations.len() < chunk.len() {
            tracing::warn!(
                batch,
                missing = chunk.len() - conversations.len(),
                "Some conversations did not finish"
            );
        }

        if let Err(e) = self
            .sink
            .record_summary(&Summary::Batch(summary.clone()))
            .await
        {
            tracing::error!(batch, error = %e, "Failed to record batch summary");
        }

        tracing::info!(
            scenario = %scenario.name,
            batch,
            conversations = summary.conversation_count,
            succeeded = summary.success_count,
            failed = summary.failure_count,
            peak_active = pool.peak_active(),
            elapsed_secs = summary.duration_secs,
            "Batch completed"
        );

        Batch {
            credential_ids: chunk.iter().map(|c| c.id().to_string()).collect(),
            conversations,
            summary,
        }
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("runner", &self.runner)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
