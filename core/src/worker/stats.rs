//! Per-conversation statistics tracking

use std::time::{Duration, Instant};

use crate::outcome::Outcome;

/// Counters kept by a conversation runner while it works
#[derive(Debug, Default, Clone)]
pub struct ConversationStats {
    /// Exchanges that succeeded
    pub succeeded: usize,

    /// Exchanges that ended in an application error
    pub application_errors: usize,

    /// Exchanges that ended in a transport error
    pub transport_errors: usize,

    /// Total time spent waiting on the network
    pub busy: Duration,

    /// Conversation start time
    pub started_at: Option<Instant>,

    /// Conversation end time
    pub ended_at: Option<Instant>,
}

impl ConversationStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Record one exchange
    pub fn record(&mut self, outcome: &Outcome, duration: Duration) {
        match outcome {
            Outcome::Success { .. } => self.succeeded += 1,
            Outcome::ApplicationError { .. } => self.application_errors += 1,
            Outcome::TransportError { .. } => self.transport_errors += 1,
        }
        self.busy += duration;
    }

    /// Failed exchanges of either kind
    pub fn failed(&self) -> usize {
        self.application_errors + self.transport_errors
    }

    /// Exchanges recorded so far
    pub fn total(&self) -> usize {
        self.succeeded + self.failed()
    }

    /// Success rate as a fraction (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total() as f64
        }
    }

    /// Elapsed time since start, including pacing
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|start| {
                self.ended_at
                    .map(|end| end.duration_since(start))
                    .unwrap_or_else(|| start.elapsed())
            })
            .unwrap_or_default()
    }
}
