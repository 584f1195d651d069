//! Command-line argument parsing.
//!
//! ```text
//! rulebridge [--config <path>] [--verbose | --quiet] [--version] [--help]
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::logging::LoggingMode;

pub const USAGE: &str = "Usage: rulebridge [--config <path>] [--verbose | --quiet] [--version]";

/// Options for a normal run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Config file; the platform default when absent.
    pub config: Option<PathBuf>,
    pub logging: LoggingMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config: None,
            logging: LoggingMode::Compact,
        }
    }
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Run the bridge (default)
    Run(RunOptions),
}

#[derive(Debug, Error, PartialEq)]
pub enum ArgsError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("unknown argument: {0}")]
    Unknown(String),
    #[error("--verbose and --quiet are mutually exclusive")]
    ConflictingVerbosity,
}

/// Parse command-line arguments (program name first).
///
/// # Examples
///
/// ```
/// use rulebridge::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["rulebridge".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), Ok(CliCommand::Version));
/// ```
pub fn parse_args<I>(args: I) -> Result<CliCommand, ArgsError>
where
    I: Iterator<Item = String>,
{
    let mut options = RunOptions::default();
    let mut verbose = false;
    let mut quiet = false;

    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(CliCommand::Version),
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--verbose" | "-v" => verbose = true,
            "--quiet" | "-q" => quiet = true,
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| ArgsError::MissingValue(arg.clone()))?;
                options.config = Some(PathBuf::from(path));
            }
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    options.config = Some(PathBuf::from(path));
                } else {
                    return Err(ArgsError::Unknown(other.to_string()));
                }
            }
        }
    }

    options.logging = match (verbose, quiet) {
        (true, true) => return Err(ArgsError::ConflictingVerbosity),
        (true, false) => LoggingMode::Verbose,
        (false, true) => LoggingMode::Silent,
        (false, false) => LoggingMode::Compact,
    };
    Ok(CliCommand::Run(options))
}
