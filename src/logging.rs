//! Tracing setup for the binary.
//!
//! Logs go to stderr so stdout stays reserved for command output.
//! `RUST_LOG` takes precedence over the verbosity passed on the CLI.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER_READY: OnceLock<()> = OnceLock::new();

/// Maps `-v` occurrences to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    LOGGER_READY.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

        // Fails only if another subscriber was installed first, which is fine.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .try_init();
    });
}
