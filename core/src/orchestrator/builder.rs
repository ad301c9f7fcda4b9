//! Builder pattern for BatchScheduler construction

use std::sync::Arc;

use indicatif::ProgressBar;

use crate::error::{ConfigError, ConfigResult};
use crate::traits::{NullSink, ResultSink};
use crate::worker::ConversationRunner;

use super::scheduler::BatchScheduler;

/// Builder for creating a BatchScheduler
///
/// # Example
///
/// ```ignore
/// let scheduler = BatchSchedulerBuilder::new()
///     .runner(runner)
///     .sink(store)
///     .progress(Some(bar))
///     .build()?;
/// ```
pub struct BatchSchedulerBuilder {
    runner: Option<Arc<ConversationRunner>>,
    sink: Option<Arc<dyn ResultSink>>,
    progress: Option<ProgressBar>,
}

impl BatchSchedulerBuilder {
    /// Create a new scheduler builder
    pub fn new() -> Self {
        Self {
            runner: None,
            sink: None,
            progress: None,
        }
    }

    /// Set the conversation runner
    pub fn runner(mut self, runner: Arc<ConversationRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Set the sink batch summaries are written to
    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Report batch progress on this bar
    pub fn progress(mut self, progress: Option<ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    /// Build the scheduler
    ///
    /// # Errors
    ///
    /// Returns an error if the runner is not set.
    pub fn build(self) -> ConfigResult<BatchScheduler> {
        let runner = self
            .runner
            .ok_or_else(|| ConfigError::Missing("runner"))?;

        Ok(BatchScheduler::new(
            runner,
            self.sink.unwrap_or_else(|| Arc::new(NullSink)),
            self.progress,
        ))
    }
}

impl Default for BatchSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
