//! Logger setup for the command-line tool: `[HH:MM:SS] LEVEL: message` on
//! stderr, where the timestamp is the time elapsed since startup.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Map the verbosity switches to a level: quiet wins over verbose
pub fn level_for(verbose: bool, quiet: bool) -> log::LevelFilter {
    if quiet {
        log::LevelFilter::Warn
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Install the global logger. `RUST_LOG` still overrides the level.
pub fn init_logger(level: log::LevelFilter) {
    START_TIME.set(Instant::now()).ok();

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let secs = START_TIME
                .get()
                .map(|start| start.elapsed().as_secs())
                .unwrap_or(0);
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
