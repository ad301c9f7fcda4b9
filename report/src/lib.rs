//! Report generation for chatload runs
//!
//! This crate projects an aggregated [`RunSummary`](chatload_core::RunSummary)
//! into a self-contained HTML document:
//!
//! - Health banner ([`Severity`])
//! - Run totals and latency percentiles
//! - Per-scenario and per-batch tables
//! - Deduplicated error patterns

#![warn(missing_docs)]
#![warn(clippy::all)]

mod html;
mod severity;

pub use html::{escape, ReportMeta, ReportRenderer};
pub use severity::Severity;
