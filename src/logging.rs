//! Tracing subscriber setup for binaries and tests
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the application.

use tracing_subscriber::{fmt, EnvFilter};

/// Map a `-v` count to a filter. `RUST_LOG` wins when no `-v` was given.
pub fn filter_for_verbosity(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install a global subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging(verbose: u8, json: bool) -> bool {
    let builder = fmt()
        .with_env_filter(filter_for_verbosity(verbose))
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
