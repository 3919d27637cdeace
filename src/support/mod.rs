//! Cross-cutting utilities: error types, OCPP-J framing, shutdown signalling.

pub mod errors;
pub mod ocpp_frame;
pub mod shutdown;

/// Install a test-writer tracing subscriber so endpoint tests log through
/// the harness. Safe to call from every test; later calls are no-ops.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
