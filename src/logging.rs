//! Subscriber setup for binaries. The library itself only emits events.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "EXTENDKIT_LOG";

/// Install a stderr `fmt` subscriber.
///
/// `EXTENDKIT_LOG` wins when set and parseable; otherwise the level is `info`,
/// or `debug` for the crate when `verbose` is set. Calling this twice is
/// harmless: the second subscriber is simply not installed.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter(verbose))
}

fn default_filter(verbose: bool) -> EnvFilter {
    let directive = if verbose { "info,extendkit=debug" } else { "info" };
    EnvFilter::new(directive)
}
