//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Initialize `tracing` output on stderr, filtered by `RUST_LOG` (default `warn`)
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
