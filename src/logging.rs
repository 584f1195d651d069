//! Logging setup for the bridge binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary (or to an embedding application).
//!
//! # Environment Variables
//!
//! - `RULEBRIDGE_LOG`: filter directives (e.g. `rulebridge::connection=debug`)
//! - `RUST_LOG`: used when `RULEBRIDGE_LOG` is not set

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output style for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber installed.
    Silent,
    /// Compact single-line output at `info`.
    Compact,
    /// Thread ids and source locations at `debug`.
    Verbose,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install the global subscriber for `mode`.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Compact => Registry::default()
            .with(fmt::layer().with_target(true).compact())
            .with(create_env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Verbose => Registry::default()
            .with(
                fmt::layer()
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(create_env_filter("debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(directives) = std::env::var("RULEBRIDGE_LOG") {
        EnvFilter::new(directives)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}
