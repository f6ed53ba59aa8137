//! Diagnostics initialization.
//!
//! Engine internals emit `tracing` events. Nothing is printed unless:
//! - `--debug` is given: events from this crate at `debug` and above
//! - `RUST_LOG` is set: whatever its filter selects
//!
//! Events go to stderr so they never mix with the report or `--json` output.

use tracing_subscriber::EnvFilter;

const DEBUG_FILTER: &str = "git_octopus=debug";

/// Install the stderr subscriber if diagnostics were asked for.
///
/// Calling it more than once is harmless; only the first call installs.
pub fn init(debug: bool) {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if debug => EnvFilter::new(DEBUG_FILTER),
        Err(_) => return,
    };

    // Already installed (tests, embedding): keep the existing one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
