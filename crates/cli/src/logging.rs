//! Logging setup for the CLI.
//!
//! Logs go to stderr so `--json` stdout stays a single JSON value. `RUST_LOG`
//! overrides the level chosen by `-v` / `-q`.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Map `-v` count and `-q` to a level. Default is `warn`.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Call once, before any command runs.
pub fn init_logging(level: Level) {
    let filter = build_env_filter(level);
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    // A second init (tests embedding the CLI) is harmless.
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level_str = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // external crates stay at warn
        EnvFilter::new(format!("warn,gst_recon={level_str},gst_recon_cli={level_str}"))
    })
}
