//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{
    accounts::AccountsArgs, cleanup::CleanupArgs, deploy::DeployArgs, registry::RegistryArgs,
    validate::ValidateArgs, whitelist::WhitelistArgs,
};

#[derive(Parser, Debug)]
#[command(name = "factory-deploy")]
#[command(about = "Deploy and validate factory-registered CosmWasm contracts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./deploy.yaml)
    #[arg(short, long, global = true, env = "DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fund accounts and deploy every contract to the selected networks
    Deploy(DeployArgs),

    /// Run the agent and task lifecycle scenario against deployed contracts
    Validate(ValidateArgs),

    /// Show the named accounts and their balances
    Accounts(AccountsArgs),

    /// Allow an agent address to register with the agents contract
    Whitelist(WhitelistArgs),

    /// Show contracts registered in the factory
    Registry(RegistryArgs),

    /// Remove every task not owned by the factory
    Cleanup(CleanupArgs),
}
