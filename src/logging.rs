//! Log subscriber setup for the binary.
//!
//! Output goes to stderr so it never mixes with rendered job output.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;

/// Environment variable holding an `EnvFilter` directive, e.g. `postsource=debug`.
pub const ENV_LOG: &str = "POSTSOURCE_LOG";

/// Default level for a number of `-v` flags.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Build the filter from `POSTSOURCE_LOG`, falling back to the verbosity level.
pub fn build_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)))
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(verbosity: u8) {
    let _ = fmt()
        .with_env_filter(build_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
