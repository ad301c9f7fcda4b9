//! Single-request dispatch: send, time, classify

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::credential::Credential;
use crate::outcome::Outcome;
use crate::request::ChatRequest;
use crate::traits::Transport;

/// System message sent ahead of every prompt unless overridden
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A dispatched request together with its measured outcome
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Request body as sent
    pub request: ChatRequest,
    /// When the request was sent
    pub started_at: DateTime<Utc>,
    /// Wall-clock time until the outcome was known
    pub duration: Duration,
    /// Classified outcome
    pub outcome: Outcome,
    /// Decoded body of an application error, when there was one
    pub response: Option<Value>,
}

/// Sends one request and classifies the result
///
/// Side-effect free beyond the network call. No retries.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    system_prompt: String,
}

impl Dispatcher {
    /// Create a dispatcher with the default system prompt
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Override the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Endpoint of the underlying transport
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Send `prompt` to `model` with `credential`, bounded by `timeout`
    pub async fn dispatch(
        &self,
        credential: &Credential,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Dispatched {
        let request = ChatRequest::new(model, self.system_prompt.as_str(), prompt);

        let started_at = Utc::now();
        let start = Instant::now();
        let reply = self.transport.send(credential, &request, timeout).await;
        let duration = start.elapsed();

        // Keep the body of application errors for error-pattern reporting
        let raw_body = reply.as_ref().ok().map(|r| r.body.clone());
        let outcome = Outcome::classify(reply);
        let response = match (&outcome, raw_body) {
            (Outcome::ApplicationError { .. }, Some(body)) => {
                Some(serde_json::from_str(&body).unwrap_or(Value::String(body)))
            }
            _ => None,
        };

        tracing::trace!(
            credential = credential.id(),
            model,
            outcome = outcome.tag(),
            elapsed_ms = duration.as_secs_f64() * 1000.0,
            "Dispatched request"
        );

        Dispatched {
            request,
            started_at,
            duration,
            outcome,
            response,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport.name())
            .field("endpoint", &self.transport.endpoint())
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Reply, TransportFailure};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedTransport {
        reply: Result<Reply, TransportFailure>,
        seen: Mutex<Vec<(String, ChatRequest, Duration)>>,
    }

    impl ScriptedTransport {
        fn new(reply: Result<Reply, TransportFailure>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        fn endpoint(&self) -> &str {
            "http://localhost/v1/chat/completions"
        }

        async fn send(
            &self,
            credential: &Credential,
            request: &ChatRequest,
            timeout: Duration,
        ) -> Result<Reply, TransportFailure> {
            self.seen.lock().unwrap().push((
                credential.secret().to_string(),
                request.clone(),
                timeout,
            ));
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_dispatch_builds_request() {
        let transport = Arc::new(ScriptedTransport::new(Ok(Reply {
            status: 200,
            body: r#"{"choices": []}"#.to_string(),
        })));
        let dispatcher = Dispatcher::new(transport.clone()).with_system_prompt("Be brief.");
        let credential = Credential::new("k1", "sk-abc");

        let dispatched = dispatcher
            .dispatch(&credential, "Hello", "m1", Duration::from_secs(5))
            .await;

        assert!(dispatched.outcome.is_success());
        assert!(dispatched.response.is_none());
        assert_eq!(dispatched.request, ChatRequest::new("m1", "Be brief.", "Hello"));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "sk-abc");
        assert_eq!(seen[0].2, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_dispatch_keeps_error_body() {
        let transport = Arc::new(ScriptedTransport::new(Ok(Reply {
            status: 429,
            body: r#"{"error": {"message": "rate limited"}}"#.to_string(),
        })));
        let dispatcher = Dispatcher::new(transport);

        let dispatched = dispatcher
            .dispatch(&Credential::new("k", "s"), "p", "m", Duration::from_secs(1))
            .await;

        assert_eq!(
            dispatched.outcome.error_message().as_deref(),
            Some("rate limited")
        );
        assert_eq!(
            dispatched.response.unwrap()["error"]["message"],
            "rate limited"
        );
    }

    #[tokio::test]
    async fn test_dispatch_transport_failure() {
        let transport = Arc::new(ScriptedTransport::new(Err(TransportFailure::new(
            28,
            "timed out",
        ))));
        let dispatcher = Dispatcher::new(transport);

        let dispatched = dispatcher
            .dispatch(&Credential::new("k", "s"), "p", "m", Duration::from_millis(10))
            .await;

        assert!(matches!(
            dispatched.outcome,
            Outcome::TransportError { code: 28, .. }
        ));
        assert!(dispatched.response.is_none());
    }
}
