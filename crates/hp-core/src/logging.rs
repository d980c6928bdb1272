//! Logging setup and per-component log macros
//!
//! Components log under fixed targets (`cpu`, `debug`, `bios`) so a filter
//! such as `RUST_LOG=debug=trace` can follow one of them alone.

use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LogLevel};

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `RUST_LOG` directives on top of a default level
fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}

/// Install the global subscriber described by `config`.
///
/// Later calls are ignored. A log file that cannot be created is reported on
/// the console and skipped.
pub fn init(config: &Config) {
    let level = LevelFilter::from(config.debug.log_level);
    if level == LevelFilter::OFF {
        return;
    }

    let console = fmt::layer().with_target(true).with_line_number(true);

    let file = config
        .debug
        .log_to_file
        .then(|| std::fs::File::create(&config.debug.log_path))
        .and_then(|created| match created {
            Ok(file) => Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false)),
            Err(e) => {
                eprintln!("Cannot open log file {}: {}", config.debug.log_path.display(), e);
                None
            }
        });

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console)
        .with(file)
        .try_init();
}

/// Install an `info`-level console subscriber
pub fn init_default() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(LevelFilter::INFO))
        .with(fmt::layer())
        .try_init();
}

/// Route logs through the test harness's captured output
pub fn init_for_tests() {
    let _ = fmt()
        .with_env_filter(env_filter(LevelFilter::WARN))
        .with_test_writer()
        .try_init();
}

/// Trace-level event under the `cpu` target
#[macro_export]
macro_rules! cpu_trace {
    ($($arg:tt)*) => { tracing::trace!(target: "cpu", $($arg)*) };
}

/// Debug-level event under the `cpu` target
#[macro_export]
macro_rules! cpu_debug {
    ($($arg:tt)*) => { tracing::debug!(target: "cpu", $($arg)*) };
}

/// Trace-level event under the `debug` target
#[macro_export]
macro_rules! dbg_trace {
    ($($arg:tt)*) => { tracing::trace!(target: "debug", $($arg)*) };
}

/// Debug-level event under the `debug` target
#[macro_export]
macro_rules! dbg_debug {
    ($($arg:tt)*) => { tracing::debug!(target: "debug", $($arg)*) };
}

/// Decoded BIOS calls, under the `bios` target
#[macro_export]
macro_rules! bios_debug {
    ($($arg:tt)*) => { tracing::debug!(target: "bios", $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::OFF);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
    }
}
