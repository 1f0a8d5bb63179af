//! `validate` command.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{error_chain, list_table, outcome_label, output, truncate, CommandOutput};
use crate::domain::models::Config;
use crate::services::{NetworkRun, Orchestrator, StepOutcome, StepReport, ValidationReport};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Network to validate; every supported network when omitted
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NetworkValidationOutput {
    pub network: String,
    pub passed: bool,
    pub steps: Vec<StepReport>,
    /// Set when the scenario could not start
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub networks: Vec<NetworkValidationOutput>,
}

impl ValidateOutput {
    pub fn failed(&self) -> usize {
        self.networks.iter().filter(|n| !n.passed).count()
    }
}

impl From<Vec<NetworkRun<ValidationReport>>> for ValidateOutput {
    fn from(runs: Vec<NetworkRun<ValidationReport>>) -> Self {
        let networks = runs
            .into_iter()
            .map(|run| match run.outcome {
                Ok(report) => NetworkValidationOutput {
                    network: run.network,
                    passed: report.passed(),
                    steps: report.steps,
                    error: None,
                },
                Err(e) => NetworkValidationOutput {
                    network: run.network,
                    passed: false,
                    steps: Vec::new(),
                    error: Some(error_chain(&e)),
                },
            })
            .collect();
        Self { networks }
    }
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for network in &self.networks {
            let verdict = if network.passed { "passed" } else { "failed" };
            lines.push(format!("{}: {}", network.network, outcome_label(verdict)));

            if let Some(error) = &network.error {
                lines.push(format!("  {error}"));
                lines.push(String::new());
                continue;
            }

            let mut table = list_table(&["step", "outcome", "detail"]);
            for step in &network.steps {
                let (outcome, detail) = match &step.outcome {
                    StepOutcome::Passed => ("passed", ""),
                    StepOutcome::Skipped(reason) => ("skipped", reason.as_str()),
                    StepOutcome::Failed(reason) => ("failed", reason.as_str()),
                };
                table.add_row(vec![
                    step.step.clone(),
                    outcome_label(outcome),
                    truncate(detail, 80),
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

pub async fn execute(args: ValidateArgs, config: Config, json_mode: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config);
    let runs = orchestrator.validate(args.network.as_deref()).await?;
    let result = ValidateOutput::from(runs);
    output(&result, json_mode);

    let failed = result.failed();
    if failed > 0 {
        bail!("Validation failed on {failed} network(s)");
    }
    Ok(())
}
