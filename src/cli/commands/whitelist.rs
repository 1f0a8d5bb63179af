//! `whitelist` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::services::Orchestrator;

#[derive(Args, Debug)]
pub struct WhitelistArgs {
    /// Agent address to allow
    pub address: String,

    /// Network of the agents contract; derived from the address prefix when omitted
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WhitelistOutput {
    pub success: bool,
    pub network: String,
    pub agent: String,
    pub tx_hash: String,
}

impl CommandOutput for WhitelistOutput {
    fn to_human(&self) -> String {
        format!(
            "Whitelisted {} on {} (tx {})",
            self.agent, self.network, self.tx_hash
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: WhitelistArgs, config: Config, json_mode: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config);
    let run = orchestrator
        .whitelist(&args.address, args.network.as_deref())
        .await?;

    let network = run.network;
    let tx = run
        .outcome
        .with_context(|| format!("Whitelisting {} on {network} failed", args.address))?;
    output(
        &WhitelistOutput {
            success: true,
            network,
            agent: args.address,
            tx_hash: tx.hash,
        },
        json_mode,
    );
    Ok(())
}
