//! Logging setup for the CLI.
//!
//! Logs go to stderr so stdout carries only JSON.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g. `info`,
/// `nobias_core=debug`) applies.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}
