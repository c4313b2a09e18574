//! Logging bootstrap for binaries and tests.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install a stderr `fmt` subscriber filtered by `filter` (an `EnvFilter`
/// directive such as `info` or `kaflow_api=debug`).
///
/// Only the first call has an effect. Returns whether this process now has
/// our subscriber installed; `false` means another global subscriber won.
pub fn init_logging(filter: &str) -> bool {
    *INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .is_ok()
    })
}
