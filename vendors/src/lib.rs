//! Transport implementations for chat-completion endpoints
//!
//! This crate provides the reqwest-backed [`HttpTransport`], the production
//! implementation of `chatload_core::Transport`. It works with any
//! OpenAI-compatible endpoint (OpenAI, vLLM, SGLang, proxies).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod errors;
mod http;

pub use errors::{classify_reqwest_error, VendorError};
pub use http::{HttpConfig, HttpTransport};
