//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a plain-text `fmt` subscriber writing to stdout.
///
/// Level defaults to `info`; `RUST_LOG` overrides it. Safe to call more than
/// once, later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
