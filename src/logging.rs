//! Logging configuration and initialization
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own can install the default one here.

use tracing::debug;

/// Get the env-filter directive for a verbosity level
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug,cascade=debug",
        2 => "trace",
        _ => "trace,tokio=debug",
    }
}

/// Install a formatted subscriber for the given verbosity.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(verbose: u8) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(log_level(verbose))
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .try_init()
        .is_ok();

    if installed {
        debug!("cascade logging initialised at verbosity {}", verbose);
    }
    installed
}
