//! Logging setup shared by the Rust API and the C library.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install a subscriber filtered by `RUST_LOG`, defaulting to `warn`.
///
/// Only the first call does anything. A subscriber the host already
/// installed is left in place.
pub fn init() {
    init_with_filter("warn");
}

/// Like [`init`] with a custom default filter.
pub fn init_with_filter(default_filter: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init();
    });
}

/// Segment prefixes for log messages.
pub mod prefix {
    /// Graph startup
    pub const OPEN: &str = "✿";
    /// Graph shutdown
    pub const CLOSE: &str = "❀";
    /// Packet flow on the worker
    pub const FLOW: &str = "꩜";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init_with_filter("debug");
        tracing::warn!("{} logging initialised twice", prefix::OPEN);
    }
}
