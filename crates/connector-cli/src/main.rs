//! Connector CLI: quote and forward against a statically configured connector.
//!
//! Subcommands: init, quote-liquidity, quote-source, quote-destination, forward.

mod commands;
mod topology;

use anyhow::Context;
use clap::{Parser, Subcommand};
use connector_core::config::LoggingConfig;
use connector_core::ConnectorConfig;
use connector_routing::RouteBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Connector: quotes and forwards payments between peer accounts.
#[derive(Parser, Debug)]
#[command(name = "connector", version, about, long_about = None)]
struct Cli {
    /// Path to the config file.
    #[arg(short, long, global = true, default_value = "connector.toml")]
    config: PathBuf,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a sample connector configuration.
    Init(commands::init::InitArgs),
    /// Quote a liquidity curve toward a destination.
    QuoteLiquidity(commands::quote::LiquidityArgs),
    /// Quote the amount delivered for a fixed source amount.
    QuoteSource(commands::quote::AmountArgs),
    /// Quote the amount to send for a fixed destination amount.
    QuoteDestination(commands::quote::AmountArgs),
    /// Build the outbound packet for an incoming prepare.
    Forward(commands::forward::ForwardArgs),
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Load the config, install logging and assemble the route builder.
fn setup(cli: &Cli) -> anyhow::Result<RouteBuilder> {
    let config = ConnectorConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    init_tracing(&config.logging);
    tracing::debug!(path = %cli.config.display(), "config loaded");
    topology::build(&config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::QuoteLiquidity(args) => commands::quote::liquidity(&setup(&cli)?, args, cli.json).await,
        Commands::QuoteSource(args) => commands::quote::by_source(&setup(&cli)?, args, cli.json).await,
        Commands::QuoteDestination(args) => {
            commands::quote::by_destination(&setup(&cli)?, args, cli.json).await
        }
        Commands::Forward(args) => commands::forward::run(&setup(&cli)?, args, cli.json).await,
    }
}
