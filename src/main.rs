//! Reagent CLI entry point.

use clap::Parser;

use reagent::cli::{self, Cli, Commands};
use reagent::infrastructure::{config::ConfigLoader, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli
        .config
        .as_ref()
        .map_or_else(ConfigLoader::load, ConfigLoader::load_from_file)
    {
        Ok(config) => config,
        Err(err) => cli::handle_error(&err, cli.json),
    };

    if let Err(err) = logging::init(&config.logging) {
        cli::handle_error(&err, cli.json);
    }

    let result = match cli.command {
        Commands::Ask {
            ref question,
            tier,
            ref user,
            stream,
        } => cli::ask(&config, question, tier, user.as_deref(), stream, cli.json).await,
        Commands::Health => cli::health(&config, cli.json).await,
    };

    if let Err(err) = result {
        cli::handle_error(&err, cli.json);
    }
}
