//! Diagnostic logging.
//!
//! The library only emits `tracing` events. The binary installs a stderr
//! subscriber with [`init`]; the level comes from `-v` flags unless
//! `FLATSITE_LOG` holds an explicit filter (`FLATSITE_LOG=flatsite=debug`).

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the verbosity flags.
pub const LOG_ENV: &str = "FLATSITE_LOG";

/// Default filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .try_init()
        .ok();
}
