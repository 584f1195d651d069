//! CLI module.
//!
//! The dispatcher is called early in `main()`, before logging and the
//! runtime are set up:
//!
//! ```ignore
//! use rulebridge::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args())?;
//! if let Some(options) = run_cli_command(command) {
//!     // start the bridge with `options`
//! }
//! ```

pub mod args;
pub mod version;

pub use args::{parse_args, ArgsError, CliCommand, RunOptions, USAGE};
pub use version::{version_report, VERSION};

/// Run a CLI command if applicable.
///
/// Returns the run options when the bridge should start; `Version` and `Help`
/// print their text and return `None`.
pub fn run_cli_command(command: CliCommand) -> Option<RunOptions> {
    match command {
        CliCommand::Version => {
            println!("{}", version_report());
            None
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            None
        }
        CliCommand::Run(options) => Some(options),
    }
}
