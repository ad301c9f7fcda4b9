//! Run aggregation: per-group counts, latency percentiles and error patterns
//!
//! [`aggregate`] is a pure function of the exchange records. Everything it
//! reports (durations included) is derived from the records themselves, and
//! every map is ordered, so aggregating the same tree twice yields an equal
//! [`RunSummary`] that serializes to identical bytes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exchange::{seconds_between, Exchange};
use crate::request::ChatRequest;

// ============================================================================
// Latency
// ============================================================================

/// Exchange latency percentiles (all values in seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LatencyPercentiles {
    /// Minimum value
    pub min: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub mean: f64,
}

impl LatencyPercentiles {
    /// Calculate percentiles from a slice of values
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let len = sorted.len();
        Self {
            min: sorted[0],
            p50: percentile(&sorted, 0.50),
            p90: percentile(&sorted, 0.90),
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
            max: sorted[len - 1],
            mean: sorted.iter().sum::<f64>() / len as f64,
        }
    }
}

/// Percentile of sorted values using linear interpolation
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = p * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let frac = idx - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

// ============================================================================
// Group statistics
// ============================================================================

/// Counts and rates for a group of exchanges (run, scenario, batch, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GroupStats {
    /// Exchanges in the group
    pub total: usize,
    /// Successful exchanges
    pub succeeded: usize,
    /// Failed exchanges
    pub failed: usize,
    /// `succeeded / total`, 0 when the group is empty
    pub success_rate: f64,
    /// Earliest exchange start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_start: Option<DateTime<Utc>>,
    /// Latest exchange end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_end: Option<DateTime<Utc>>,
    /// Span from `first_start` to `last_end`, in seconds
    pub duration_secs: f64,
    /// Exchanges per second over `duration_secs`, 0 when the span is 0
    pub throughput: f64,
    /// Per-exchange latency
    pub latency: LatencyPercentiles,
}

#[derive(Default)]
struct GroupAccumulator {
    succeeded: usize,
    latencies: Vec<f64>,
    first_start: Option<DateTime<Utc>>,
    last_end: Option<DateTime<Utc>>,
}

impl GroupAccumulator {
    fn add(&mut self, exchange: &Exchange) {
        if exchange.is_success() {
            self.succeeded += 1;
        }
        self.latencies.push(exchange.duration_secs);

        let start = exchange.started_at;
        let end = exchange.finished_at();
        self.first_start = Some(self.first_start.map_or(start, |t| t.min(start)));
        self.last_end = Some(self.last_end.map_or(end, |t| t.max(end)));
    }

    fn finish(self) -> GroupStats {
        let total = self.latencies.len();
        let duration_secs = match (self.first_start, self.last_end) {
            (Some(start), Some(end)) => seconds_between(start, end).max(0.0),
            _ => 0.0,
        };

        GroupStats {
            total,
            succeeded: self.succeeded,
            failed: total - self.succeeded,
            success_rate: ratio(self.succeeded as f64, total as f64),
            first_start: self.first_start,
            last_end: self.last_end,
            duration_secs,
            throughput: ratio(total as f64, duration_secs),
            latency: LatencyPercentiles::from_values(&self.latencies),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Statistics for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Scenario the batch ran under
    pub scenario: String,
    /// Conversations in the batch
    pub conversations: usize,
    /// Exchange statistics
    #[serde(flatten)]
    pub stats: GroupStats,
}

// ============================================================================
// Error patterns
// ============================================================================

/// The exchange kept as an example of an error pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    /// Conversation the exchange belongs to
    pub conversation_id: String,
    /// Position within the conversation
    pub sequence: usize,
    /// When the request was sent
    pub started_at: DateTime<Utc>,
    /// Request body as sent
    pub request: ChatRequest,
    /// Response body, when one was received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// Failed exchanges sharing a `(model, error message)` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    /// Model requested
    pub model: String,
    /// Error message
    pub message: String,
    /// Number of occurrences
    pub count: usize,
    /// Earliest occurrence
    pub representative: ErrorSample,
}

// ============================================================================
// Run summary
// ============================================================================

/// Aggregated view of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunSummary {
    /// Whole-run statistics
    pub overall: GroupStats,
    /// Per-scenario statistics
    pub scenarios: BTreeMap<String, GroupStats>,
    /// Per-batch statistics, by batch index
    pub batches: BTreeMap<usize, BatchStats>,
    /// Per-conversation statistics, by conversation id
    pub conversations: BTreeMap<String, GroupStats>,
    /// Per-model statistics
    pub models: BTreeMap<String, GroupStats>,
    /// Error buckets, most frequent first
    pub error_patterns: Vec<ErrorPattern>,
}

impl RunSummary {
    /// Check if the run produced no exchanges
    pub fn is_empty(&self) -> bool {
        self.overall.total == 0
    }
}

/// Aggregate exchange records into a [`RunSummary`]
///
/// Input order does not matter: records are first sorted by start time,
/// conversation id and sequence, which also decides each error pattern's
/// representative.
pub fn aggregate(records: &[Exchange]) -> RunSummary {
    let mut sorted: Vec<&Exchange> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.started_at
            .cmp(&b.started_at)
            .then_with(|| a.conversation_id.cmp(&b.conversation_id))
            .then_with(|| a.sequence.cmp(&b.sequence))
    });

    let mut overall = GroupAccumulator::default();
    let mut scenarios: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut batches: BTreeMap<usize, (String, BTreeSet<String>, GroupAccumulator)> =
        BTreeMap::new();
    let mut conversations: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut models: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut patterns: BTreeMap<(String, String), ErrorPattern> = BTreeMap::new();

    for exchange in sorted {
        overall.add(exchange);
        scenarios
            .entry(exchange.scenario.clone())
            .or_default()
            .add(exchange);
        conversations
            .entry(exchange.conversation_id.clone())
            .or_default()
            .add(exchange);
        models
            .entry(exchange.model.clone())
            .or_default()
            .add(exchange);

        let batch = batches
            .entry(exchange.batch)
            .or_insert_with(|| (exchange.scenario.clone(), BTreeSet::new(), Default::default()));
        batch.1.insert(exchange.conversation_id.clone());
        batch.2.add(exchange);

        if let Some(message) = exchange.outcome.error_message() {
            patterns
                .entry((exchange.model.clone(), message.clone()))
                .and_modify(|p| p.count += 1)
                .or_insert_with(|| ErrorPattern {
                    model: exchange.model.clone(),
                    message,
                    count: 1,
                    representative: ErrorSample {
                        conversation_id: exchange.conversation_id.clone(),
                        sequence: exchange.sequence,
                        started_at: exchange.started_at,
                        request: exchange.request.clone(),
                        response: exchange.response.clone(),
                    },
                });
        }
    }

    let mut error_patterns: Vec<ErrorPattern> = patterns.into_values().collect();
    error_patterns.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.model.cmp(&b.model))
            .then_with(|| a.message.cmp(&b.message))
    });

    let finish = |groups: BTreeMap<String, GroupAccumulator>| {
        groups
            .into_iter()
            .map(|(key, acc)| (key, acc.finish()))
            .collect::<BTreeMap<_, _>>()
    };

    RunSummary {
        overall: overall.finish(),
        scenarios: finish(scenarios),
        batches: batches
            .into_iter()
            .map(|(index, (scenario, convs, acc))| {
                (
                    index,
                    BatchStats {
                        scenario,
                        conversations: convs.len(),
                        stats: acc.finish(),
                    },
                )
            })
            .collect(),
        conversations: finish(conversations),
        models: finish(models),
        error_patterns,
    }
}
