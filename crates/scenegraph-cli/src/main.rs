//! SceneGraph CLI
//!
//! Command-line interface for SceneGraph templates and scene files.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use scenegraph_cli::cli::{Cli, Command};
use scenegraph_cli::config::SceneGraphConfig;
use scenegraph_cli::{commands, config_handlers};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter override.
const LOG_ENV: &str = "SCENEGRAPH_LOG";

fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    if let Command::Config { action } = cli.command {
        init_logging(cli.verbose, scenegraph_cli::config::DEFAULT_LOG_LEVEL)?;
        return config_handlers::handle_config_command(config_path, action)
            .context("config command failed");
    }

    let config = SceneGraphConfig::load(config_path).context("failed to load configuration")?;
    init_logging(cli.verbose, &config.log.level)?;
    tracing::debug!("Using configuration: {config:?}");

    match cli.command {
        Command::Template { file, keep_raw } => commands::cmd_template(&config, &file, keep_raw)?,
        Command::Info { scene } => commands::cmd_info(&config, &scene)?,
        Command::Validate { scene } => commands::cmd_validate(&config, &scene)?,
        Command::Apply {
            scene,
            script,
            output,
        } => commands::cmd_apply(&config, &scene, &script, output.as_deref())?,
        Command::New { output, force } => commands::cmd_new(&output, force)?,
        Command::Config { .. } => {}
    }
    Ok(())
}
