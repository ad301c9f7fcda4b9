//! Conversation runner: one credential, N sequential exchanges
//!
//! A conversation is the unit of work the scheduler hands to its pool. The
//! runner performs the loop **prompt -> dispatch -> record -> pause** for a
//! fixed number of exchanges:
//!
//! 1. Samples a prompt from the PromptSource
//! 2. Dispatches it with the conversation's credential
//! 3. Hands the classified exchange to the ResultSink
//! 4. Pauses for a randomized interval (not after the last exchange)
//!
//! Failed exchanges are recorded like any other; the conversation always
//! runs to its full length.
//!
//! # Example
//!
//! ```ignore
//! use chatload_core::worker::{ConversationRunnerBuilder, Pacing};
//!
//! let runner = ConversationRunnerBuilder::new()
//!     .dispatcher(dispatcher)
//!     .prompts(sampler)
//!     .sink(store)
//!     .pacing(Pacing::default())
//!     .timeout(Duration::from_secs(60))
//!     .default_model("gpt-4o-mini")
//!     .build()?;
//!
//! let conversation = runner.run("default", 1, &credential, 3).await;
//! println!("Succeeded: {}", conversation.summary.success_count);
//! ```

mod builder;
mod pacing;
mod runner;
mod stats;

pub use builder::ConversationRunnerBuilder;
pub use pacing::Pacing;
pub use runner::ConversationRunner;
pub use stats::ConversationStats;
