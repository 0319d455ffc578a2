//! Tracing subscriber setup.
//!
//! `--verbose` picks the default level; `RUST_LOG`, when set, wins. All log
//! output goes to stderr so stdout stays reserved for replies.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `--verbose` level.
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 4)
        .try_init();
}
