//! `accounts` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{error_chain, list_table, output, CommandOutput};
use crate::domain::models::Config;
use crate::services::{AccountBalance, AccountsView, NetworkRun, Orchestrator};

#[derive(Args, Debug)]
pub struct AccountsArgs {
    /// Network to inspect; every supported network when omitted
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NetworkAccountsOutput {
    pub network: String,
    pub denom: String,
    pub accounts: Vec<AccountBalance>,
    pub deployer_underfunded: bool,
    pub required_deployer_balance: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountsOutput {
    pub networks: Vec<NetworkAccountsOutput>,
}

impl From<Vec<NetworkRun<AccountsView>>> for AccountsOutput {
    fn from(runs: Vec<NetworkRun<AccountsView>>) -> Self {
        let networks = runs
            .into_iter()
            .map(|run| match run.outcome {
                Ok(view) => NetworkAccountsOutput {
                    deployer_underfunded: view.deployer_underfunded(),
                    network: run.network,
                    denom: view.denom,
                    required_deployer_balance: view.required_deployer_balance.to_string(),
                    accounts: view.balances,
                    error: None,
                },
                Err(e) => NetworkAccountsOutput {
                    network: run.network,
                    denom: String::new(),
                    accounts: Vec::new(),
                    deployer_underfunded: false,
                    required_deployer_balance: String::new(),
                    error: Some(error_chain(&e)),
                },
            })
            .collect();
        Self { networks }
    }
}

impl CommandOutput for AccountsOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for network in &self.networks {
            lines.push(format!("{}:", network.network));
            if let Some(error) = &network.error {
                lines.push(format!("  {error}\n"));
                continue;
            }

            let mut table = list_table(&["role", "address", "balance"]);
            for account in &network.accounts {
                table.add_row(vec![
                    account.role.to_string(),
                    account.address.clone(),
                    format!("{}{}", account.balance, network.denom),
                ]);
            }
            lines.push(table.to_string());
            if network.deployer_underfunded {
                lines.push(format!(
                    "  Deployer needs at least {}{} to fund the other accounts",
                    network.required_deployer_balance, network.denom
                ));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AccountsArgs, config: Config, json_mode: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config);
    let runs = orchestrator.accounts(args.network.as_deref()).await?;
    output(&AccountsOutput::from(runs), json_mode);
    Ok(())
}
