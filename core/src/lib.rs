//! chatload-core: Core data model and execution engine for chatload
//!
//! This crate provides everything between "a list of credentials" and "a
//! tree of recorded exchanges", including:
//!
//! - The wire request and the [`Outcome`] classification rule
//! - The [`Dispatcher`] (one request, timed and classified)
//! - The conversation runner ([`worker`]) and batch scheduler ([`orchestrator`])
//! - Run aggregation ([`metrics`])
//! - Core traits (Transport, PromptSource, ResultSink)
//! - Configuration and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod orchestrator;
pub mod outcome;
pub mod request;
pub mod traits;
pub mod worker;

pub use config::{RunConfig, Scenario, DEFAULT_SCENARIO};
pub use credential::Credential;
pub use dispatcher::{Dispatched, Dispatcher, DEFAULT_SYSTEM_PROMPT};
pub use error::*;
pub use exchange::*;
pub use metrics::*;
pub use orchestrator::{
    batch_count, planned_exchanges, BatchScheduler, BatchSchedulerBuilder, WorkerPool,
};
pub use outcome::{Outcome, NO_SUCCESS_FIELD};
pub use request::*;
pub use traits::*;
pub use worker::{ConversationRunner, ConversationRunnerBuilder, ConversationStats, Pacing};

#[cfg(test)]
mod integration_tests {
    use super::*;

    // =========================================================================
    // Wire format compatibility tests
    // =========================================================================

    #[test]
    fn test_exchange_json_layout() {
        let exchange = Exchange {
            scenario: DEFAULT_SCENARIO.to_string(),
            batch: 1,
            credential_id: "key-1".to_string(),
            conversation_id: conversation_id(1, "key-1"),
            sequence: 2,
            prompt: "Hello".to_string(),
            model: "m1".to_string(),
            request: ChatRequest::new("m1", DEFAULT_SYSTEM_PROMPT, "Hello"),
            started_at: chrono::Utc::now(),
            duration_secs: 0.25,
            outcome: Outcome::ApplicationError {
                message: "rate limited".to_string(),
            },
            response: Some(serde_json::json!({"error": {"message": "rate limited"}})),
        };

        let json = serde_json::to_value(&exchange).unwrap();
        assert_eq!(json["outcome"]["status"], "application_error");
        assert_eq!(json["outcome"]["message"], "rate limited");
        assert_eq!(json["request"]["stream"], false);
        assert_eq!(json["request"]["messages"][0]["role"], "system");
        assert_eq!(json["request"]["messages"][1]["content"], "Hello");

        let parsed: Exchange = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, exchange);
    }

    #[test]
    fn test_success_exchange_omits_response() {
        let exchange = Exchange {
            scenario: DEFAULT_SCENARIO.to_string(),
            batch: 1,
            credential_id: "k".to_string(),
            conversation_id: conversation_id(1, "k"),
            sequence: 1,
            prompt: "p".to_string(),
            model: "m".to_string(),
            request: ChatRequest::new("m", "s", "p"),
            started_at: chrono::Utc::now(),
            duration_secs: 1.0,
            outcome: Outcome::Success {
                response: serde_json::json!({"choices": [{"index": 0}]}),
            },
            response: None,
        };

        let json = serde_json::to_string(&exchange).unwrap();
        assert!(!json.contains("\"response\":null"));
        assert!(json.contains("\"status\":\"success\""));
    }

    #[test]
    fn test_summary_levels_serialize() {
        let batch = BatchSummary::from_conversations("default", 3, &[], 0.0);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["batch"], 3);
        assert_eq!(json["conversation_count"], 0);
        assert!(json.get("first_dispatch_at").is_none());
    }
}
