//! Development-time tracing for the engine.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: lifecycle diagnostics via `RUST_LOG`, output to
//!   stderr. Not persisted.
//!
//! - **Pulse traces (`io/trace`)**: one JSON line per pulse, written only when
//!   `spine run --trace` is given. Unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=spine::core::runtime=debug cargo run -- run --scenario demo.toml
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
