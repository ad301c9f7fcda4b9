//! Credential type shared by the scheduler and the transport

use std::fmt;

/// An opaque bearer secret plus the metadata needed to use it
///
/// Credentials are immutable once loaded. The secret never appears in
/// `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    id: String,
    secret: String,
    model: Option<String>,
}

impl Credential {
    /// Create a credential with no bound model
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            model: None,
        }
    }

    /// Bind a model name to this credential
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Credential identifier (used in result paths)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw secret, sent verbatim in the `Authorization` header
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Model bound to this credential, if any
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Bound model, falling back to the run default
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }

    /// Check that the id is safe to use as a single path component
    pub fn has_path_safe_id(&self) -> bool {
        !self.id.is_empty()
            && self.id != "."
            && self.id != ".."
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}
