//! Factory Deploy CLI entry point.

use clap::Parser;

use factory_deploy::cli::{commands, handle_error, Cli, Commands};
use factory_deploy::infrastructure::config::ConfigLoader;
use factory_deploy::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::execute(args, config, cli.json).await,
        Commands::Validate(args) => commands::validate::execute(args, config, cli.json).await,
        Commands::Accounts(args) => commands::accounts::execute(args, config, cli.json).await,
        Commands::Whitelist(args) => commands::whitelist::execute(args, config, cli.json).await,
        Commands::Registry(args) => commands::registry::execute(args, config, cli.json).await,
        Commands::Cleanup(args) => commands::cleanup::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
