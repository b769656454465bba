//! Tracing subscriber bootstrap (SPEC_FULL.md §4.8).
//!
//! Grounded on the teacher's `cli/bootstrap/logging.rs`, generalized to take
//! an explicit `debug` flag instead of reading a `Config.logging.level`
//! field (this tool has no equivalent config section; `--debug` is the only
//! verbosity knob per §6).

use tracing::info;

/// Install the global `tracing` subscriber. Must be called exactly once,
/// by the CLI driver, before any library code logs.
pub fn init_logging(debug: bool) {
    let level = if debug { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_max_level(level)
        .with_ansi(true)
        .init();

    info!(?level, "logging initialized");
}
