//! Tracing setup shared by the integration suite and embedding binaries.

/// Install a fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `txexec=info` when the variable is unset. A no-op when a dispatcher is
/// already installed, so tests can call it from every setup path.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("txexec=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
