//! Log subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;

/// Install the global `tracing` subscriber on stderr.
///
/// `RUST_LOG` wins over the verbosity flags. Installing twice is a no-op.
pub fn init_logging(verbosity: Verbosity, color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .try_init();
}
