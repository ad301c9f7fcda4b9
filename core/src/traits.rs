//! Core traits for transports, prompt sources and result sinks
//!
//! These traits are defined in core to avoid circular dependencies.
//! Implementations live in their respective crates (vendors/, samplers/,
//! storage/).

use std::time::Duration;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::SinkError;
use crate::exchange::{BatchSummary, ConversationSummary, Exchange};
use crate::request::ChatRequest;

// ============================================================================
// Transport Trait
// ============================================================================

/// Network seam used by the [`Dispatcher`](crate::Dispatcher)
///
/// A transport only moves bytes. It reports a [`TransportFailure`] when no
/// response was obtained and otherwise hands back the raw body, whatever the
/// HTTP status. Classification happens in [`Outcome::classify`](crate::Outcome::classify).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport identifier (e.g., "http")
    fn name(&self) -> &str;

    /// Endpoint requests are sent to
    fn endpoint(&self) -> &str;

    /// POST one request, bounded by `timeout`; never retries
    async fn send(
        &self,
        credential: &Credential,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<Reply, TransportFailure>;
}

/// A response that made it back over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

/// A network-level failure, tagged with a curl-compatible code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport error {code}: {description}")]
pub struct TransportFailure {
    /// Transport status code
    pub code: i32,
    /// Human-readable description
    pub description: String,
}

impl TransportFailure {
    /// URL could not be parsed or the request could not be built
    pub const MALFORMED_URL: i32 = 3;
    /// Host name could not be resolved
    pub const DNS_RESOLUTION: i32 = 6;
    /// Connection refused or otherwise failed
    pub const CONNECT_FAILED: i32 = 7;
    /// Request exceeded its timeout
    pub const TIMED_OUT: i32 = 28;
    /// Connection dropped while receiving the response
    pub const RECEIVE_FAILED: i32 = 56;

    /// Create a failure with the given code
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

// ============================================================================
// Prompt Source Trait
// ============================================================================

/// Supplies user prompts for exchanges
///
/// Sampling with replacement is expected; no cryptographic randomness is
/// required.
pub trait PromptSource: Send + Sync {
    /// Source name for identification
    fn name(&self) -> &str;

    /// Draw one prompt
    fn sample(&self) -> String;
}

// ============================================================================
// Result Sink Trait
// ============================================================================

/// Summary levels written once their constituent exchanges are complete
#[derive(Debug, Clone)]
pub enum Summary {
    /// Written after the last exchange of a conversation
    Conversation(ConversationSummary),
    /// Written after a batch's join barrier releases
    Batch(BatchSummary),
}

/// Destination for exchanges and summaries
///
/// Exchange writes are addressed by `(batch, credential id, sequence)`, which
/// is unique per write, so implementations need no locking for them.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist one exchange
    async fn record(&self, exchange: &Exchange) -> Result<(), SinkError>;

    /// Persist a conversation- or batch-level summary
    async fn record_summary(&self, summary: &Summary) -> Result<(), SinkError>;
}

/// Sink that keeps nothing; useful when only the in-memory result matters
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn record(&self, _exchange: &Exchange) -> Result<(), SinkError> {
        Ok(())
    }

    async fn record_summary(&self, _summary: &Summary) -> Result<(), SinkError> {
        Ok(())
    }
}
