//! `deploy` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{error_chain, list_table, outcome_label, output, truncate, CommandOutput};
use crate::domain::models::{Config, FactoryRecord};
use crate::services::{DeployReport, Orchestrator};

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Network to deploy to; every supported network when omitted
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeployedContractOutput {
    pub name: String,
    pub code_id: u64,
    pub address: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct NetworkDeployOutput {
    pub network: String,
    /// deployed, partial or failed
    pub status: String,
    pub transfers: usize,
    pub contracts: Vec<DeployedContractOutput>,
    pub error: Option<String>,
    pub artifacts_path: Option<String>,
    pub artifacts_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeployOutput {
    pub networks: Vec<NetworkDeployOutput>,
    pub factories: Vec<FactoryRecord>,
    pub factories_path: Option<String>,
}

impl From<DeployReport> for DeployOutput {
    fn from(report: DeployReport) -> Self {
        let networks = report
            .networks
            .into_iter()
            .map(|run| match run.outcome {
                Ok(deployment) => NetworkDeployOutput {
                    status: if deployment.is_complete() {
                        "deployed".to_string()
                    } else {
                        "partial".to_string()
                    },
                    transfers: deployment.funding.transfers.len(),
                    contracts: deployment
                        .artifacts
                        .iter()
                        .map(|a| DeployedContractOutput {
                            name: a.name.clone(),
                            code_id: a.code_id,
                            address: a.address.clone(),
                            version: a.version.to_string(),
                        })
                        .collect(),
                    error: deployment.failure,
                    artifacts_path: deployment
                        .artifacts_path
                        .map(|p| p.display().to_string()),
                    artifacts_error: deployment.artifacts_error,
                    network: run.network,
                },
                Err(e) => NetworkDeployOutput {
                    network: run.network,
                    status: "failed".to_string(),
                    transfers: 0,
                    contracts: Vec::new(),
                    error: Some(error_chain(&e)),
                    artifacts_path: None,
                    artifacts_error: None,
                },
            })
            .collect();

        Self {
            networks,
            factories: report.factories,
            factories_path: report.factories_path.map(|p| p.display().to_string()),
        }
    }
}

impl CommandOutput for DeployOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();

        let mut contracts = list_table(&["network", "contract", "code id", "version", "address"]);
        for network in &self.networks {
            for contract in &network.contracts {
                contracts.add_row(vec![
                    network.network.clone(),
                    contract.name.clone(),
                    contract.code_id.to_string(),
                    contract.version.clone(),
                    contract.address.clone(),
                ]);
            }
        }
        if self.networks.iter().any(|n| !n.contracts.is_empty()) {
            lines.push(contracts.to_string());
            lines.push(String::new());
        }

        let mut summary = list_table(&["network", "status", "funded", "contracts", "error"]);
        for network in &self.networks {
            summary.add_row(vec![
                network.network.clone(),
                outcome_label(&network.status),
                network.transfers.to_string(),
                network.contracts.len().to_string(),
                network
                    .error
                    .as_deref()
                    .or(network.artifacts_error.as_deref())
                    .map(|e| truncate(e, 80))
                    .unwrap_or_default(),
            ]);
        }
        lines.push(summary.to_string());

        if let Some(path) = &self.factories_path {
            lines.push(format!("\nFactories recorded in {path}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: DeployArgs, config: Config, json_mode: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config);
    let report = orchestrator.deploy(args.network.as_deref()).await?;
    output(&DeployOutput::from(report), json_mode);
    Ok(())
}
