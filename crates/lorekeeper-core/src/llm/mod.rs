//! Completion-service abstractions for Lorekeeper.
//!
//! - `LlmProvider`: RPITIT trait for concrete backends
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `DeltaStream`: cancellable channel carrying streamed text deltas
//! - `LlmClient`: closed-book prompt construction over a provider

pub mod box_provider;
pub mod client;
pub mod delta;
pub mod provider;
