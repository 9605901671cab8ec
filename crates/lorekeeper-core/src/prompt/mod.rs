//! Prompt construction: retrieved-context formatting and system prompts.

pub mod context;
pub mod system;
