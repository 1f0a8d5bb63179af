//! Lifecycle validator: scripted agent and task scenario against a deployed
//! network.
//!
//! Every step is isolated: a failed step is logged and recorded, and the
//! scenario moves on. The verdict is the conjunction of all steps.

use backoff::ExponentialBackoffBuilder;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{ChainError, RegistryQueryError, ValidationFailure};
use crate::domain::models::{
    AccountRole, Action, AgentStatus, Coin, Interval, TaskRequest, TasksExecuteMsg,
    ValidatorConfig,
};
use crate::services::contracts::{AgentsClient, ManagerClient, TasksClient};
use crate::services::pipeline::{AGENTS, MANAGER, TASKS};
use crate::services::registry_client::{encode_msg, RegistryClient};
use crate::services::session::NetworkSession;

/// Addresses of the core contracts, as registered in the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedContracts {
    pub factory: String,
    pub manager: String,
    pub tasks: String,
    pub agents: String,
}

impl DeployedContracts {
    /// Resolve the latest manager, tasks and agents from the factory registry
    pub async fn resolve(registry: &RegistryClient<'_>) -> Result<Self, RegistryQueryError> {
        let latest = registry.latest_contracts().await?;
        let find = |name: &str| {
            latest
                .iter()
                .find(|entry| entry.contract_name == name)
                .map(|entry| entry.metadata.contract_addr.clone())
                .ok_or_else(|| RegistryQueryError::MissingContract(name.to_string()))
        };
        Ok(Self {
            factory: registry.factory().to_string(),
            manager: find(MANAGER)?,
            tasks: find(TASKS)?,
            agents: find(AGENTS)?,
        })
    }
}

/// Result of one scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    /// Not applicable in the observed state; counts as passed
    Skipped(String),
    Failed(String),
}

impl StepOutcome {
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Per-step results of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub network: String,
    pub steps: Vec<StepReport>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        !self.steps.iter().any(|s| s.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.outcome.is_failure())
    }
}

/// Tasks touched by a cleanup sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed: Vec<String>,
    /// Factory-owned tasks, never removed
    pub kept: Vec<String>,
    /// `(task_hash, reason)` of removals that failed
    pub failed: Vec<(String, String)>,
}

/// Remove every listed task not owned by the factory
///
/// Each task is removed by the session account that owns it. Tasks owned by
/// an address outside the session are reported as failed.
#[instrument(skip(session, contracts), fields(network = %session.chain_name()))]
pub async fn sweep_tasks(
    session: &NetworkSession,
    contracts: &DeployedContracts,
) -> Result<SweepReport, ChainError> {
    let tasks = TasksClient::new(session, &contracts.tasks);
    let mut report = SweepReport::default();

    for task in tasks.tasks().await? {
        if task.owner_addr == contracts.factory {
            report.kept.push(task.task_hash);
            continue;
        }
        let Some(role) = session.accounts().role_of(&task.owner_addr) else {
            warn!(task_hash = %task.task_hash, owner = %task.owner_addr, "Task owner is not a session account");
            report
                .failed
                .push((task.task_hash, format!("owner {} is not a session account", task.owner_addr)));
            continue;
        };

        match tasks.remove(session.address(role), &task.task_hash).await {
            Ok(tx) => {
                info!(task_hash = %task.task_hash, %role, tx_hash = %tx.hash, outcome = "SUCCESS", "Removed task");
                report.removed.push(task.task_hash);
            }
            Err(e) => {
                error!(task_hash = %task.task_hash, %role, error = %e, outcome = "ERROR", "Removing task failed");
                report.failed.push((task.task_hash, e.to_string()));
            }
        }
    }

    Ok(report)
}

enum PollError {
    NotYet(AgentStatus),
    Chain(ChainError),
}

/// Scripted agent lifecycle scenario
pub struct LifecycleValidator<'a> {
    config: &'a ValidatorConfig,
    deploy_gas: u64,
}

impl<'a> LifecycleValidator<'a> {
    pub const fn new(config: &'a ValidatorConfig, deploy_gas: u64) -> Self {
        Self { config, deploy_gas }
    }

    /// Run the whole scenario; never stops early
    #[instrument(skip(self, session, contracts), fields(network = %session.chain_name()))]
    pub async fn run(&self, session: &NetworkSession, contracts: &DeployedContracts) -> ValidationReport {
        let mut report = ValidationReport {
            network: session.chain_name().to_string(),
            steps: Vec::new(),
        };

        let agents = AgentsClient::new(session, &contracts.agents);
        let tasks = TasksClient::new(session, &contracts.tasks);
        let manager = ManagerClient::new(session, &contracts.manager);
        let registry = RegistryClient::new(session, &contracts.factory, self.deploy_gas);
        let agent1 = session.address(AccountRole::Agent(1));
        let agent2 = session.address(AccountRole::Agent(2));

        record(&mut report, "register_agent1", async {
            agents.register(agent1).await?;
            expect_status(&agents, agent1, AgentStatus::Active).await
        })
        .await;

        record(&mut report, "create_factory_task", async {
            let tick = encode_msg(&json!({"tick": {}}))?;
            let task = TaskRequest::recurring(
                Interval::Block(1),
                true,
                vec![Action::wasm_execute(&contracts.agents, tick, self.config.action_gas_limit)],
            );
            let msg = TasksExecuteMsg::CreateTask {
                task: Box::new(task),
            };
            let funds = [Coin::new(
                u128::from(self.config.factory_task_funds),
                session.denom(),
            )];
            registry
                .proxy_call(session.deployer(), &contracts.tasks, &msg, &funds)
                .await?;
            passed()
        })
        .await;

        record(&mut report, "create_task_1", self.create_task(session, &tasks, contracts, 1))
            .await;

        record(&mut report, "register_agent2", async {
            agents.register(agent2).await?;
            expect_status(&agents, agent2, AgentStatus::Pending).await
        })
        .await;

        record(&mut report, "create_task_2", self.create_task(session, &tasks, contracts, 2))
            .await;
        record(&mut report, "create_task_3", self.create_task(session, &tasks, contracts, 3))
            .await;

        record(&mut report, "await_agent2_nomination", async {
            self.await_status(&agents, agent2, AgentStatus::Nominated).await?;
            passed()
        })
        .await;

        record(&mut report, "check_in_agent2", async {
            agents.check_in(agent2).await?;
            expect_status(&agents, agent2, AgentStatus::Active).await
        })
        .await;

        for (step, agent) in [("proxy_call_agent1", agent1), ("proxy_call_agent2", agent2)] {
            record(&mut report, step, async {
                manager.proxy_call(agent, None).await?;
                passed()
            })
            .await;
        }

        for (step, agent) in [("withdraw_agent1", agent1), ("withdraw_agent2", agent2)] {
            record(&mut report, step, async {
                let reward = agents
                    .get_agent(agent)
                    .await?
                    .agent
                    .map_or(0, |info| info.reward());
                if reward == 0 {
                    return Ok(StepOutcome::Skipped("no reward accrued".to_string()));
                }
                manager.agent_withdraw(agent).await?;
                passed()
            })
            .await;
        }

        for (step, agent) in [("unregister_agent1", agent1), ("unregister_agent2", agent2)] {
            record(&mut report, step, async {
                agents.unregister(agent).await?;
                expect_status(&agents, agent, AgentStatus::Unregistered).await
            })
            .await;
        }

        record(&mut report, "assert_no_agents", async {
            let ids = agents.get_agent_ids().await?;
            if ids.is_empty() {
                passed()
            } else {
                Err(ValidationFailure::assertion(
                    "no active or pending agents",
                    format!("active {:?}, pending {:?}", ids.active, ids.pending),
                ))
            }
        })
        .await;

        record(&mut report, "cleanup_tasks", async {
            let sweep = sweep_tasks(session, contracts).await?;
            if let Some((hash, reason)) = sweep.failed.first() {
                return Err(ValidationFailure::assertion(
                    "every non-factory task removed",
                    format!("{hash}: {reason}"),
                ));
            }
            let removed: HashSet<&str> = sweep.removed.iter().map(String::as_str).collect();
            let remaining: Vec<String> = tasks
                .tasks()
                .await?
                .into_iter()
                .map(|t| t.task_hash)
                .filter(|hash| removed.contains(hash.as_str()))
                .collect();
            if remaining.is_empty() {
                passed()
            } else {
                Err(ValidationFailure::assertion(
                    "removed tasks absent",
                    format!("still listed: {}", remaining.join(", ")),
                ))
            }
        })
        .await;

        report
    }

    /// Deployer-owned task sending `n` tokens to the manager every block
    async fn create_task(
        &self,
        session: &NetworkSession,
        tasks: &TasksClient<'_>,
        contracts: &DeployedContracts,
        n: u128,
    ) -> Result<StepOutcome, ValidationFailure> {
        let denom = session.denom();
        let task = TaskRequest::recurring(
            Interval::Block(1),
            false,
            vec![Action::bank_send(
                &contracts.manager,
                vec![Coin::new(n, denom)],
                self.config.action_gas_limit,
            )],
        );
        let funds = self
            .config
            .task_funds
            .get(usize::try_from(n - 1).unwrap_or(usize::MAX))
            .or_else(|| self.config.task_funds.last())
            .copied()
            .unwrap_or_default();
        let (tx, task_hash) = tasks
            .create(session.deployer(), task, &[Coin::new(u128::from(funds), denom)])
            .await?;
        info!(
            task_hash = task_hash.as_deref().unwrap_or("unknown"),
            tx_hash = %tx.hash,
            funds,
            "Created task"
        );
        passed()
    }

    /// Poll the agent's status with exponential backoff until it equals
    /// `expected`, failing with `TimedOut` once the bound is exceeded
    async fn await_status(
        &self,
        agents: &AgentsClient<'_>,
        agent: &str,
        expected: AgentStatus,
    ) -> Result<(), ValidationFailure> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.config.nomination_initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.config.nomination_max_backoff_ms))
            .with_max_elapsed_time(Some(Duration::from_millis(self.config.nomination_timeout_ms)))
            .build();
        let started = Instant::now();

        let polled = backoff::future::retry(policy, || async {
            match agents.status(agent).await {
                Ok(status) if status == expected => Ok(()),
                Ok(status) => Err(backoff::Error::transient(PollError::NotYet(status))),
                Err(e) if e.is_transient() => Err(backoff::Error::transient(PollError::Chain(e))),
                Err(e) => Err(backoff::Error::permanent(PollError::Chain(e))),
            }
        })
        .await;

        match polled {
            Ok(()) => Ok(()),
            Err(PollError::NotYet(last)) => Err(ValidationFailure::TimedOut {
                waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                last: last.to_string(),
            }),
            Err(PollError::Chain(e)) => Err(e.into()),
        }
    }
}

async fn expect_status(
    agents: &AgentsClient<'_>,
    agent: &str,
    expected: AgentStatus,
) -> Result<StepOutcome, ValidationFailure> {
    let actual = agents.status(agent).await?;
    if actual == expected {
        passed()
    } else {
        Err(ValidationFailure::assertion(expected, actual))
    }
}

const fn passed() -> Result<StepOutcome, ValidationFailure> {
    Ok(StepOutcome::Passed)
}

/// Run one step and record its outcome
async fn record<F>(report: &mut ValidationReport, step: &str, fut: F)
where
    F: Future<Output = Result<StepOutcome, ValidationFailure>>,
{
    let outcome = match fut.await {
        Ok(StepOutcome::Skipped(reason)) => {
            info!(network = %report.network, step, reason = %reason, outcome = "SKIPPED", "Validator step skipped");
            StepOutcome::Skipped(reason)
        }
        Ok(_) => {
            info!(network = %report.network, step, outcome = "SUCCESS", "Validator step passed");
            StepOutcome::Passed
        }
        Err(e) => {
            error!(network = %report.network, step, error = %e, outcome = "ERROR", "Validator step failed");
            StepOutcome::Failed(e.to_string())
        }
    };
    report.steps.push(StepReport {
        step: step.to_string(),
        outcome,
    });
}
