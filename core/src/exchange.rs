//! Exchanges, conversations and batches, plus their summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::Outcome;
use crate::request::ChatRequest;

/// Identifier of a conversation, unique within a run
///
/// A credential appears at most once per batch, so the pair
/// `(batch, credential id)` is unique; it doubles as the relative result path.
pub fn conversation_id(batch: usize, credential_id: &str) -> String {
    format!("batch_{}/conv_{}", batch, credential_id)
}

/// Seconds between two instants, with microsecond resolution
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0
}

// ============================================================================
// Exchange
// ============================================================================

/// One prompt/response round, written once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Scenario this exchange belongs to
    pub scenario: String,
    /// Batch index (1-based)
    pub batch: usize,
    /// Credential that authorized the request
    pub credential_id: String,
    /// `batch_<n>/conv_<credential id>`
    pub conversation_id: String,
    /// Position within the conversation (1-based)
    pub sequence: usize,
    /// User prompt
    pub prompt: String,
    /// Model requested
    pub model: String,
    /// Request body as sent
    pub request: ChatRequest,
    /// When the request was sent
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
    /// Classified outcome
    pub outcome: Outcome,
    /// Response body kept for failed exchanges that got one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl Exchange {
    /// Check if the exchange succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// When the response (or failure) arrived
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::microseconds((self.duration_secs * 1e6) as i64)
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Counts and timing for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Scenario name
    pub scenario: String,
    /// Batch index (1-based)
    pub batch: usize,
    /// Credential id
    pub credential_id: String,
    /// Conversation id
    pub conversation_id: String,
    /// Exchanges attempted
    pub exchange_count: usize,
    /// Exchanges that succeeded
    pub success_count: usize,
    /// Exchanges that failed
    pub failure_count: usize,
    /// When the first exchange was sent
    pub started_at: DateTime<Utc>,
    /// Elapsed time including pacing, in seconds
    pub total_duration_secs: f64,
}

/// A credential's ordered exchanges plus their summary
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Exchanges in send order
    pub exchanges: Vec<Exchange>,
    /// Summary written after the last exchange
    pub summary: ConversationSummary,
}

// ============================================================================
// Batch
// ============================================================================

/// Counts and timing for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Scenario name
    pub scenario: String,
    /// Batch index (1-based)
    pub batch: usize,
    /// Conversations that finished
    pub conversation_count: usize,
    /// Exchanges attempted across all conversations
    pub exchange_count: usize,
    /// Successful exchanges
    pub success_count: usize,
    /// Failed exchanges
    pub failure_count: usize,
    /// Earliest exchange start in the batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_dispatch_at: Option<DateTime<Utc>>,
    /// Latest exchange completion in the batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completion_at: Option<DateTime<Utc>>,
    /// Wall-clock time from submit to join barrier, in seconds
    pub duration_secs: f64,
}

impl BatchSummary {
    /// Summarize the conversations a batch produced
    pub fn from_conversations(
        scenario: &str,
        batch: usize,
        conversations: &[Conversation],
        duration_secs: f64,
    ) -> Self {
        let exchanges = || conversations.iter().flat_map(|c| c.exchanges.iter());

        Self {
            scenario: scenario.to_string(),
            batch,
            conversation_count: conversations.len(),
            exchange_count: conversations.iter().map(|c| c.summary.exchange_count).sum(),
            success_count: conversations.iter().map(|c| c.summary.success_count).sum(),
            failure_count: conversations.iter().map(|c| c.summary.failure_count).sum(),
            first_dispatch_at: exchanges().map(|e| e.started_at).min(),
            last_completion_at: exchanges().map(|e| e.finished_at()).max(),
            duration_secs,
        }
    }
}

/// Conversations produced by one batch
#[derive(Debug, Clone)]
pub struct Batch {
    /// Credential ids in submission order
    pub credential_ids: Vec<String>,
    /// Conversations, in completion order
    pub conversations: Vec<Conversation>,
    /// Summary written after the join barrier
    pub summary: BatchSummary,
}

/// Everything a run produced, in batch order
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// When the first batch was submitted
    pub started_at: DateTime<Utc>,
    /// When the last batch's barrier released
    pub finished_at: DateTime<Utc>,
    /// Batches in execution order
    pub batches: Vec<Batch>,
}

impl RunOutcome {
    /// Total exchanges across all batches
    pub fn exchange_count(&self) -> usize {
        self.batches.iter().map(|b| b.summary.exchange_count).sum()
    }

    /// Total successful exchanges across all batches
    pub fn success_count(&self) -> usize {
        self.batches.iter().map(|b| b.summary.success_count).sum()
    }

    /// Total failed exchanges across all batches
    pub fn failure_count(&self) -> usize {
        self.batches.iter().map(|b| b.summary.failure_count).sum()
    }

    /// Every exchange held in memory, in batch then completion order
    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.batches
            .iter()
            .flat_map(|b| b.conversations.iter())
            .flat_map(|c| c.exchanges.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_id_format() {
        assert_eq!(conversation_id(3, "key-7"), "batch_3/conv_key-7");
    }

    #[test]
    fn test_finished_at() {
        let start = Utc::now();
        let exchange = Exchange {
            scenario: "default".to_string(),
            batch: 1,
            credential_id: "k".to_string(),
            conversation_id: conversation_id(1, "k"),
            sequence: 1,
            prompt: "hi".to_string(),
            model: "m".to_string(),
            request: ChatRequest::new("m", "sys", "hi"),
            started_at: start,
            duration_secs: 1.5,
            outcome: Outcome::ApplicationError {
                message: "x".to_string(),
            },
            response: None,
        };

        assert!((seconds_between(start, exchange.finished_at()) - 1.5).abs() < 1e-6);
    }
}
