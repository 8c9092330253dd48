//! Logging init: stderr, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,redirector=debug,tower_http=debug";

/// Install the global subscriber. `quiet` drops the default to warnings only,
/// which keeps one-shot CLI output readable. `RUST_LOG` always wins.
pub fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { DEFAULT_FILTER };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed (tests, embedding); that is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
