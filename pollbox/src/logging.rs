//! Development-time tracing for debugging the store.
//!
//! Diagnostics go to stderr via `RUST_LOG` and are never part of command
//! output. Slot data under `.pollbox/state/` is unaffected by the log level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn` so persistence failures still surface.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=pollbox=debug pollbox vote 3 3-2
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
