//! Shared utilities.

/// Telemetry helpers for structured logging.
pub mod telemetry;

pub use telemetry::init_tracing;
