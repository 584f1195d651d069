use color_eyre::Result;
use tracing::{info, warn};

use rulebridge::cli::{parse_args, run_cli_command};
use rulebridge::config::Config;
use rulebridge::error::ConfigError;
use rulebridge::logging::init_logging;
use rulebridge::plugins::PingPlugin;
use rulebridge::runtime::Runtime;

/// Load the config file named on the command line, or the default one.
///
/// A missing default file means an unconfigured bridge; a missing explicit
/// file is an error.
fn load_config(path: Option<std::path::PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(&path)?),
        None => {
            let path = Config::default_path()?;
            match Config::load(&path) {
                Ok(config) => Ok(config),
                Err(ConfigError::NotFound(path)) => {
                    warn!("No config file at {}, using defaults", path.display());
                    Ok(Config::default())
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn main() -> Result<()> {
    let options = match run_cli_command(parse_args(std::env::args())?) {
        Some(options) => options,
        None => return Ok(()),
    };

    color_eyre::install()?;
    init_logging(options.logging)?;

    let config = load_config(options.config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let ping = PingPlugin::new(config.ping.clone());
        let bridge = Runtime::builder(config).plugin(ping).start();

        tokio::signal::ctrl_c().await?;
        info!("Interrupted, shutting down");
        bridge.shutdown().await;
        Ok::<(), color_eyre::Report>(())
    })
}
