//! Randomized delay between consecutive exchanges of a conversation

use std::time::Duration;

use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Uniform pause window, in milliseconds
///
/// The pause is drawn from `[min_ms, max_ms)`; a window with
/// `min_ms == max_ms` always yields exactly that delay, and `0..0` disables
/// pacing altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    /// Lower bound (inclusive)
    pub min_ms: u64,
    /// Upper bound (exclusive unless equal to `min_ms`)
    pub max_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_ms: 1_000,
            max_ms: 3_000,
        }
    }
}

impl Pacing {
    /// Create a pacing window
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No pause between exchanges
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Check if pacing is enabled
    pub fn is_enabled(&self) -> bool {
        self.max_ms > 0
    }

    /// Validate the window
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidPacing(format!(
                "minimum {}ms exceeds maximum {}ms",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }

    /// Draw one pause duration
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        let millis = Uniform::new(self.min_ms, self.max_ms).sample(&mut rand::thread_rng());
        Duration::from_millis(millis)
    }

    /// Sleep for one drawn pause
    pub async fn wait(&self) {
        if !self.is_enabled() {
            return;
        }
        tokio::time::sleep(self.sample()).await;
    }
}
