//! Logging initialisation for the driver binary.
//!
//! Logs go to stderr so that stdout only carries command output. `RUST_LOG`
//! takes precedence; otherwise `--debug` selects `debug`, else `info`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global tracing subscriber. Call once from `main`.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
