//! Diagnostic logging for the binary.
//!
//! Diagnostics go to stderr so they never interleave with a reply streamed to
//! stdout. The filter comes from `CHATSTREAM_LOG` (same syntax as `RUST_LOG`)
//! and defaults to `warn`.

use tracing_subscriber::EnvFilter;

use crate::core::constants::LOG_ENV_VAR;

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
