//! Batch scheduling for a whole run
//!
//! The BatchScheduler coordinates the complete run:
//! - Partitioning credentials into batches of at most `concurrency`
//! - Running each batch's conversations on a bounded WorkerPool
//! - Enforcing the join barrier between batches
//! - Writing batch summaries once each barrier releases
//!
//! # Example
//!
//! ```ignore
//! use chatload_core::orchestrator::BatchSchedulerBuilder;
//!
//! let scheduler = BatchSchedulerBuilder::new()
//!     .runner(runner)
//!     .sink(store)
//!     .build()?;
//!
//! let outcome = scheduler.run(&config.effective_scenarios(), &credentials).await?;
//! ```

mod builder;
mod pool;
mod scheduler;

pub use builder::BatchSchedulerBuilder;
pub use pool::WorkerPool;
pub use scheduler::{batch_count, planned_exchanges, BatchScheduler};
