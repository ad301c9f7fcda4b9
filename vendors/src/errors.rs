//! Mapping of reqwest failures onto transport codes

use std::error::Error as StdError;

use chatload_core::TransportFailure;
use thiserror::Error;

/// Errors raised while constructing a transport
#[derive(Debug, Error)]
pub enum VendorError {
    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Map a reqwest error to a curl-numbered [`TransportFailure`]
///
/// Timeouts are checked first: reqwest reports a connect timeout as both a
/// connect and a timeout error, and it belongs under code 28.
pub fn classify_reqwest_error(error: &reqwest::Error) -> TransportFailure {
    let description = describe(error);

    let code = if error.is_timeout() {
        TransportFailure::TIMED_OUT
    } else if error.is_builder() {
        TransportFailure::MALFORMED_URL
    } else if error.is_connect() {
        if is_dns_failure(error) {
            TransportFailure::DNS_RESOLUTION
        } else {
            TransportFailure::CONNECT_FAILED
        }
    } else {
        TransportFailure::RECEIVE_FAILED
    };

    TransportFailure::new(code, description)
}

/// Full error chain joined with ": "
fn describe(error: &reqwest::Error) -> String {
    let mut description = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !description.contains(&text) {
            description.push_str(": ");
            description.push_str(&text);
        }
        source = cause.source();
    }
    description
}

fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
            || text.contains("no such host")
        {
            return true;
        }
        source = cause.source();
    }
    false
}
