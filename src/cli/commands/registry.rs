//! `registry` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{error_chain, list_table, output, CommandOutput};
use crate::domain::models::{Config, ContractMetadata};
use crate::services::{NetworkRun, Orchestrator, RegistryView};

#[derive(Args, Debug)]
pub struct RegistryArgs {
    /// Network to query; every supported network when omitted
    pub network: Option<String>,

    /// List every registered version of this contract instead of the latest of each
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistryEntryOutput {
    pub contract_name: String,
    pub version: String,
    pub code_id: u64,
    pub address: String,
    pub checksum: String,
}

impl RegistryEntryOutput {
    fn new(contract_name: &str, metadata: &ContractMetadata) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            version: metadata.version.to_string(),
            code_id: metadata.code_id,
            address: metadata.contract_addr.clone(),
            checksum: metadata.checksum.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NetworkRegistryOutput {
    pub network: String,
    pub factory: Option<String>,
    pub entries: Vec<RegistryEntryOutput>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistryOutput {
    pub networks: Vec<NetworkRegistryOutput>,
}

impl From<Vec<NetworkRun<RegistryView>>> for RegistryOutput {
    fn from(runs: Vec<NetworkRun<RegistryView>>) -> Self {
        let networks = runs
            .into_iter()
            .map(|run| match run.outcome {
                Ok(RegistryView::Latest { factory, entries }) => NetworkRegistryOutput {
                    network: run.network,
                    factory: Some(factory),
                    entries: entries
                        .iter()
                        .map(|e| RegistryEntryOutput::new(&e.contract_name, &e.metadata))
                        .collect(),
                    error: None,
                },
                Ok(RegistryView::Versions {
                    factory,
                    contract_name,
                    versions,
                }) => NetworkRegistryOutput {
                    network: run.network,
                    factory: Some(factory),
                    entries: versions
                        .iter()
                        .map(|m| RegistryEntryOutput::new(&contract_name, m))
                        .collect(),
                    error: None,
                },
                Err(e) => NetworkRegistryOutput {
                    network: run.network,
                    factory: None,
                    entries: Vec::new(),
                    error: Some(error_chain(&e)),
                },
            })
            .collect();
        Self { networks }
    }
}

impl CommandOutput for RegistryOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for network in &self.networks {
            match (&network.factory, &network.error) {
                (_, Some(error)) => {
                    lines.push(format!("{}: {error}\n", network.network));
                    continue;
                }
                (Some(factory), None) => lines.push(format!("{} (factory {factory}):", network.network)),
                (None, None) => lines.push(format!("{}:", network.network)),
            }

            if network.entries.is_empty() {
                lines.push("  No contracts registered.\n".to_string());
                continue;
            }
            let mut table = list_table(&["contract", "version", "code id", "address"]);
            for entry in &network.entries {
                table.add_row(vec![
                    entry.contract_name.clone(),
                    entry.version.clone(),
                    entry.code_id.to_string(),
                    entry.address.clone(),
                ]);
            }
            lines.push(table.to_string());
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RegistryArgs, config: Config, json_mode: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config);
    let runs = orchestrator
        .registry(args.network.as_deref(), args.name.as_deref())
        .await?;
    output(&RegistryOutput::from(runs), json_mode);
    Ok(())
}
