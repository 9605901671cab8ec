//! Chat-turn orchestration.
//!
//! - `PipelineState`: per-request state machine with checked transitions
//! - `PipelineOrchestrator`: runs one turn blocking or as an event stream

pub mod orchestrator;
pub mod state;
