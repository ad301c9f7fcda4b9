//! Builder pattern for ConversationRunner construction

use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;

use crate::dispatcher::Dispatcher;
use crate::error::{ConfigError, ConfigResult};
use crate::traits::{NullSink, PromptSource, ResultSink};

use super::pacing::Pacing;
use super::runner::ConversationRunner;

/// Builder for creating ConversationRunner instances
///
/// # Example
/// ```ignore
/// let runner = ConversationRunnerBuilder::new()
///     .dispatcher(dispatcher)
///     .prompts(sampler)
///     .sink(store)
///     .timeout(Duration::from_secs(60))
///     .default_model("gpt-4o-mini")
///     .build()?;
/// ```
#[derive(Default)]
pub struct ConversationRunnerBuilder {
    dispatcher: Option<Arc<Dispatcher>>,
    prompts: Option<Arc<dyn PromptSource>>,
    sink: Option<Arc<dyn ResultSink>>,
    pacing: Option<Pacing>,
    timeout: Option<Duration>,
    default_model: Option<String>,
    verbose: bool,
    progress: Option<ProgressBar>,
}

impl ConversationRunnerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatcher
    pub fn dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Set the prompt source
    pub fn prompts(mut self, prompts: Arc<dyn PromptSource>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Set the result sink (defaults to [`NullSink`])
    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the pacing window (defaults to 1-3 s)
    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = Some(pacing);
        self
    }

    /// Set the per-exchange timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the model used for credentials without a bound model
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Log every exchange at info level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Advance this progress bar once per exchange
    pub fn progress(mut self, progress: Option<ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    /// Build the ConversationRunner
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> ConfigResult<ConversationRunner> {
        let dispatcher = self.dispatcher.ok_or(ConfigError::Missing("dispatcher"))?;
        let prompts = self.prompts.ok_or(ConfigError::Missing("prompts"))?;
        let timeout = self.timeout.ok_or(ConfigError::Missing("timeout"))?;
        let default_model = self
            .default_model
            .ok_or(ConfigError::Missing("default_model"))?;
        let pacing = self.pacing.unwrap_or_default();
        pacing.validate()?;

        Ok(ConversationRunner::new(
            dispatcher,
            prompts,
            self.sink.unwrap_or_else(|| Arc::new(NullSink)),
            pacing,
            timeout,
            default_model,
            self.verbose,
            self.progress,
        ))
    }
}
