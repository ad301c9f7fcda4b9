//! Result persistence
//!
//! This crate provides the on-disk layout of a run:
//!
//! ```text
//! <root>/test_<YYYYmmdd_HHMMSS>/
//!     config.json
//!     batch_<n>/summary.json
//!     batch_<n>/conv_<credential id>/exchange_<k>.json
//!     batch_<n>/conv_<credential id>/summary.json
//!     summary.json
//!     report.html
//! ```
//!
//! [`ResultStore`] writes it (and is the run's `ResultSink`);
//! [`ResultTree`] reads the exchanges back for re-aggregation.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod layout;
mod store;
mod tree;

pub use error::StoreError;
pub use layout::{RunLayout, RUN_DIR_PREFIX, TIMESTAMP_FORMAT};
pub use store::ResultStore;
pub use tree::ResultTree;
