//! Conversation execution loop

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indicatif::ProgressBar;

use crate::credential::Credential;
use crate::dispatcher::Dispatcher;
use crate::exchange::{conversation_id, Conversation, ConversationSummary, Exchange};
use crate::traits::{PromptSource, ResultSink, Summary};

use super::pacing::Pacing;
use super::stats::ConversationStats;

/// Runs one credential's conversation: prompt -> dispatch -> record -> pause
///
/// Exchanges are strictly sequential. Each one is handed to the sink before
/// the next is dispatched, so a crash mid-conversation still leaves every
/// finished exchange on disk. Failures never stop the loop.
pub struct ConversationRunner {
    dispatcher: Arc<Dispatcher>,
    prompts: Arc<dyn PromptSource>,
    sink: Arc<dyn ResultSink>,
    pacing: Pacing,
    timeout: Duration,
    default_model: String,
    verbose: bool,
    progress: Option<ProgressBar>,
}

impl ConversationRunner {
    /// Create a new runner
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        prompts: Arc<dyn PromptSource>,
        sink: Arc<dyn ResultSink>,
        pacing: Pacing,
        timeout: Duration,
        default_model: String,
        verbose: bool,
        progress: Option<ProgressBar>,
    ) -> Self {
        Self {
            dispatcher,
            prompts,
            sink,
            pacing,
            timeout,
            default_model,
            verbose,
            progress,
        }
    }

    /// Run `exchange_count` exchanges with `credential`
    ///
    /// Returns every exchange in send order plus the conversation summary,
    /// which is also written to the sink after the last exchange.
    pub async fn run(
        &self,
        scenario: &str,
        batch: usize,
        credential: &Credential,
        exchange_count: usize,
    ) -> Conversation {
        let conversation_id = conversation_id(batch, credential.id());
        let model = credential.model_or(&self.default_model).to_string();

        tracing::debug!(
            scenario,
            batch,
            credential = credential.id(),
            exchanges = exchange_count,
            "Conversation starting"
        );

        let mut stats = ConversationStats::new();
        stats.start();
        let started_at = Utc::now();
        let mut exchanges = Vec::with_capacity(exchange_count);

        for sequence in 1..=exchange_count {
            let prompt = self.prompts.sample();
            let dispatched = self
                .dispatcher
                .dispatch(credential, &prompt, &model, self.timeout)
                .await;

            stats.record(&dispatched.outcome, dispatched.duration);

            let exchange = Exchange {
                scenario: scenario.to_string(),
                batch,
                credential_id: credential.id().to_string(),
                conversation_id: conversation_id.clone(),
                sequence,
                prompt,
                model: model.clone(),
                request: dispatched.request,
                started_at: dispatched.started_at,
                duration_secs: dispatched.duration.as_secs_f64(),
                outcome: dispatched.outcome,
                response: dispatched.response,
            };

            self.log_exchange(&exchange);

            if let Err(e) = self.sink.record(&exchange).await {
                tracing::warn!(
                    conversation = %conversation_id,
                    sequence,
                    error = %e,
                    "Failed to record exchange"
                );
            }

            if let Some(ref progress) = self.progress {
                progress.inc(1);
            }

            exchanges.push(exchange);

            if sequence < exchange_count {
                self.pacing.wait().await;
            }
        }

        stats.stop();

        let summary = ConversationSummary {
            scenario: scenario.to_string(),
            batch,
            credential_id: credential.id().to_string(),
            conversation_id: conversation_id.clone(),
            exchange_count: stats.total(),
            success_count: stats.succeeded,
            failure_count: stats.failed(),
            started_at,
            total_duration_secs: stats.elapsed().as_secs_f64(),
        };

        if let Err(e) = self
            .sink
            .record_summary(&Summary::Conversation(summary.clone()))
            .await
        {
            tracing::warn!(
                conversation = %conversation_id,
                error = %e,
                "Failed to record conversation summary"
            );
        }

        tracing::debug!(
            conversation = %conversation_id,
            succeeded = stats.succeeded,
            success_rate = stats.success_rate(),
            application_errors = stats.application_errors,
            transport_errors = stats.transport_errors,
            busy_secs = stats.busy.as_secs_f64(),
            elapsed_secs = stats.elapsed().as_secs_f64(),
            "Conversation finished"
        );

        Conversation { exchanges, summary }
    }

    fn log_exchange(&self, exchange: &Exchange) {
        let error = exchange.outcome.error_message();
        if self.verbose {
            tracing::info!(
                conversation = %exchange.conversation_id,
                sequence = exchange.sequence,
                outcome = exchange.outcome.tag(),
                duration_secs = exchange.duration_secs,
                error = error.as_deref().unwrap_or(""),
                "Exchange complete"
            );
        } else {
            tracing::debug!(
                conversation = %exchange.conversation_id,
                sequence = exchange.sequence,
                outcome = exchange.outcome.tag(),
                "Exchange complete"
            );
        }
    }
}

impl std::fmt::Debug for ConversationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRunner")
            .field("dispatcher", &self.dispatcher)
            .field("prompts", &self.prompts.name())
            .field("pacing", &self.pacing)
            .field("timeout", &self.timeout)
            .field("default_model", &self.default_model)
            .finish()
    }
}
