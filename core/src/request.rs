//! Request types for chat-completion dispatch

use serde::{Deserialize, Serialize};

/// A chat-completion request body (OpenAI-compatible format)
///
/// Serializes to exactly
/// `{"model": .., "messages": [{"role":"system",..},{"role":"user",..}], "stream": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Target model
    pub model: String,

    /// System message followed by the user prompt
    pub messages: Vec<Message>,

    /// Always false: responses are read whole
    pub stream: bool,
}

impl ChatRequest {
    /// Build the two-message request sent for every exchange
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::system(system_prompt), Message::user(prompt)],
            stream: false,
        }
    }

    /// The user prompt carried by this request
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role (system, user, assistant)
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Create a new text message
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions)
    System,
    /// User message (input)
    User,
    /// Assistant message (output)
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ChatRequest::new("m1", "You are terse.", "Hello");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "model": "m1",
                "messages": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": "Hello"}
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn test_user_prompt() {
        let request = ChatRequest::new("m1", "sys", "What is 2+2?");
        assert_eq!(request.user_prompt(), Some("What is 2+2?"));
    }

    #[test]
    fn test_role_lowercase_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
