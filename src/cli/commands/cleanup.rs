//! `cleanup` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{error_chain, output, CommandOutput};
use crate::domain::models::Config;
use crate::services::{NetworkRun, Orchestrator, SweepReport};

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Network to clean up; every supported network when omitted
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NetworkCleanupOutput {
    pub network: String,
    pub sweep: Option<SweepReport>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupOutput {
    pub networks: Vec<NetworkCleanupOutput>,
}

impl From<Vec<NetworkRun<SweepReport>>> for CleanupOutput {
    fn from(runs: Vec<NetworkRun<SweepReport>>) -> Self {
        let networks = runs
            .into_iter()
            .map(|run| {
                let (sweep, error) = match run.outcome {
                    Ok(sweep) => (Some(sweep), None),
                    Err(e) => (None, Some(error_chain(&e))),
                };
                NetworkCleanupOutput {
                    network: run.network,
                    sweep,
                    error,
                }
            })
            .collect();
        Self { networks }
    }
}

impl CommandOutput for CleanupOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for network in &self.networks {
            match (&network.sweep, &network.error) {
                (Some(sweep), _) => {
                    lines.push(format!(
                        "{}: removed {} task(s), kept {} factory task(s), {} failed",
                        network.network,
                        sweep.removed.len(),
                        sweep.kept.len(),
                        sweep.failed.len()
                    ));
                    for (hash, reason) in &sweep.failed {
                        lines.push(format!("  {hash}: {reason}"));
                    }
                }
                (None, Some(error)) => lines.push(format!("{}: {error}", network.network)),
                (None, None) => lines.push(format!("{}: nothing to do", network.network)),
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: CleanupArgs, config: Config, json_mode: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config);
    let runs = orchestrator.cleanup(args.network.as_deref()).await?;
    output(&CleanupOutput::from(runs), json_mode);
    Ok(())
}
