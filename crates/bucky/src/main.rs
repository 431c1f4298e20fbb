//! Bucky command line entry point.

use anyhow::{Context, Result};
use bucky::cli::{Cli, Commands};
use bucky::commands;
use bucky_core::{Config, LogFormat};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("bucky {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = load_config(&cli)?;
    cli.apply_logging(&mut config.logging);
    init_logging(&config);

    match cli.command {
        Commands::Inconsistent(args) => commands::handle_inconsistent(config, args).await,
        Commands::Backfill(args) => commands::handle_backfill(config, args).await,
        Commands::Rebalance(args) => commands::handle_rebalance(config, args).await,
        Commands::Version => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref()).context("Failed to load configuration")
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }
}
