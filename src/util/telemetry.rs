//! Telemetry helpers for structured logging.

/// Installs a default env-filtered fmt subscriber, unless the caller already
/// installed one. Intended for binaries and tests; library code only emits
/// `tracing` events and never configures the subscriber itself.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
