//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use chatload_core::{ChatRequest, Credential, Reply, Transport, TransportFailure};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

use crate::errors::{classify_reqwest_error, VendorError};

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Connection settings for the shared HTTP client.
///
/// The per-request timeout is not part of this config: it is supplied with
/// every call to [`Transport::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    /// Maximum idle connections kept per host
    pub max_idle_per_host: usize,

    /// TCP connect timeout
    pub connect_timeout: Option<Duration>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::for_concurrency(1)
    }
}

impl HttpConfig {
    /// Keep one idle connection per conversation that may run at once
    pub fn for_concurrency(concurrency: usize) -> Self {
        Self {
            max_idle_per_host: concurrency.max(1),
            connect_timeout: None,
            user_agent: format!("chatload/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// POSTs chat requests to a single endpoint over a pooled reqwest client.
///
/// The credential secret is sent verbatim as the `Authorization` header
/// value. Any HTTP status is handed back as a [`Reply`]; only failures to get
/// a response at all become a [`TransportFailure`].
///
/// # Example
///
/// ```rust,ignore
/// let config = HttpConfig::for_concurrency(8);
/// let transport = HttpTransport::new("https://api.example.com/v1/chat/completions", &config)?;
/// let dispatcher = Dispatcher::new(Arc::new(transport));
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for `endpoint`.
    ///
    /// The endpoint is not parsed here; a malformed URL surfaces as a
    /// transport failure (code 3) on every exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, config: &HttpConfig) -> Result<Self, VendorError> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(&config.user_agent);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        tracing::debug!(
            max_idle_per_host = config.max_idle_per_host,
            connect_timeout = ?config.connect_timeout,
            "Building HTTP client"
        );

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(
        &self,
        credential: &Credential,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<Reply, TransportFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, credential.secret())
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        tracing::trace!(
            credential = credential.id(),
            status,
            bytes = body.len(),
            "Received response"
        );

        Ok(Reply { status, body })
    }
}

// ============================================================================
// Tests
// ============================================================================
