//! Observability for Lorekeeper: tracing subscriber setup.

pub mod tracing_setup;

pub use tracing_setup::{LogOptions, TracingGuard, init_tracing, shutdown_tracing};
