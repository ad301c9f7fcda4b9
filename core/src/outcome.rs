//! Exchange outcome and its classification rule

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::traits::{Reply, TransportFailure};

/// Message recorded when a decoded body carries no `choices` field
pub const NO_SUCCESS_FIELD: &str = "no success field";

/// Field whose presence marks a successful completion
const SUCCESS_FIELD: &str = "choices";

/// Result of one exchange; exactly one tag per exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The API returned a completion
    Success {
        /// Decoded response body
        response: Value,
    },

    /// The API answered, but with an error or without a completion
    ApplicationError {
        /// Message extracted from `error`/`detail`, or [`NO_SUCCESS_FIELD`]
        message: String,
    },

    /// The request never produced a response (DNS, connect, timeout, bad URL)
    TransportError {
        /// Transport status code (curl exit-code numbering)
        code: i32,
        /// Human-readable failure description
        description: String,
    },
}

impl Outcome {
    /// Classify a transport result
    ///
    /// The order is fixed:
    /// 1. transport failure → `TransportError`
    /// 2. body has a non-null `error` or `detail` field → `ApplicationError`
    /// 3. body has no `choices` field (or is not JSON) → `ApplicationError`
    /// 4. otherwise → `Success`
    ///
    /// HTTP status codes play no part: a 4xx/5xx with a JSON error body is an
    /// application error, a 200 without `choices` is one too.
    pub fn classify(reply: Result<Reply, TransportFailure>) -> Self {
        let reply = match reply {
            Ok(reply) => reply,
            Err(failure) => {
                return Outcome::TransportError {
                    code: failure.code,
                    description: failure.description,
                }
            }
        };

        let body: Value = match serde_json::from_str(&reply.body) {
            Ok(body) => body,
            Err(_) => {
                return Outcome::ApplicationError {
                    message: NO_SUCCESS_FIELD.to_string(),
                }
            }
        };

        Self::classify_body(body)
    }

    /// Classify an already decoded body (steps 2-4 of [`Outcome::classify`])
    pub fn classify_body(body: Value) -> Self {
        if let Some(message) = error_message(&body) {
            return Outcome::ApplicationError { message };
        }

        match body.get(SUCCESS_FIELD) {
            Some(choices) if !choices.is_null() => Outcome::Success { response: body },
            _ => Outcome::ApplicationError {
                message: NO_SUCCESS_FIELD.to_string(),
            },
        }
    }

    /// Check if this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Short tag name, as serialized
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::ApplicationError { .. } => "application_error",
            Outcome::TransportError { .. } => "transport_error",
        }
    }

    /// Error text used as the error-pattern key; `None` on success
    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::ApplicationError { message } => Some(message.clone()),
            Outcome::TransportError { code, description } => {
                Some(format!("transport error {}: {}", code, description))
            }
        }
    }
}

/// Extract the message from an `error` or `detail` field
///
/// `error` may be an object with a `message` member or a plain string;
/// `detail` may be a string or any JSON value. Null fields are ignored.
fn error_message(body: &Value) -> Option<String> {
    if let Some(error) = body.get("error").filter(|v| !v.is_null()) {
        let message = match error {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("message") {
                Some(Value::String(s)) => s.clone(),
                _ => error.to_string(),
            },
            other => other.to_string(),
        };
        return Some(message);
    }

    body.get("detail")
        .filter(|v| !v.is_null())
        .map(|detail| match detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
