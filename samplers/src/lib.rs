//! Prompt sources for conversations
//!
//! This crate provides [`PromptSampler`], the implementation of the
//! `PromptSource` trait used by the conversation runner. Prompts come from a
//! text file (one per line), an in-memory list, or a built-in set of general
//! questions.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod prompts;

pub use prompts::{PromptSampler, BUILTIN_PROMPTS};
