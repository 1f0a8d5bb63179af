//! Deployment pipeline: Factory, Manager, Tasks, Agents, then library modules.
//!
//! Stages run strictly in order on one session. Every later stage needs the
//! factory address, and the core contracts reference each other by registry
//! key, so the first failure ends the run for that network. Artifacts of the
//! stages that completed are still returned.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{error, info, instrument};

use crate::domain::errors::{ChainError, DeploymentError};
use crate::domain::models::{
    AccountRole, AgentsInstantiateMsg, Coin, ContractArtifact, FactoryInstantiateMsg,
    LibraryInstantiateMsg, ManagerInstantiateMsg, ModuleKind, RegistryKey, TasksInstantiateMsg,
};
use crate::domain::ports::{BuildSource, ModuleBuild};
use crate::services::registry_client::RegistryClient;
use crate::services::session::NetworkSession;

/// Registry names of the core contracts
pub const FACTORY: &str = "factory";
pub const MANAGER: &str = "manager";
pub const TASKS: &str = "tasks";
pub const AGENTS: &str = "agents";

/// One step of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Factory,
    Manager,
    Tasks,
    Agents,
    Module(String),
}

impl Stage {
    pub fn contract_name(&self) -> &str {
        match self {
            Self::Factory => FACTORY,
            Self::Manager => MANAGER,
            Self::Tasks => TASKS,
            Self::Agents => AGENTS,
            Self::Module(name) => name,
        }
    }

    const fn kind(&self) -> Option<ModuleKind> {
        match self {
            Self::Factory => None,
            Self::Manager => Some(ModuleKind::Manager),
            Self::Tasks => Some(ModuleKind::Tasks),
            Self::Agents => Some(ModuleKind::Agents),
            Self::Module(_) => Some(ModuleKind::Library),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// Outcome of one pipeline run on one network
#[derive(Debug)]
pub struct PipelineReport {
    pub network: String,
    /// Artifacts of the completed stages, in stage order
    pub artifacts: Vec<ContractArtifact>,
    pub failure: Option<DeploymentError>,
}

impl PipelineReport {
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn factory(&self) -> Option<&ContractArtifact> {
        self.artifacts.iter().find(|a| a.name == FACTORY)
    }
}

/// Ordered deployment of every contract of one network
pub struct DeploymentPipeline<'a> {
    build: &'a dyn BuildSource,
    modules: Vec<String>,
    deploy_gas: u64,
}

impl<'a> DeploymentPipeline<'a> {
    /// `modules` are the library contracts deployed after the core ones
    pub fn new(build: &'a dyn BuildSource, modules: Vec<String>, deploy_gas: u64) -> Self {
        Self {
            build,
            modules,
            deploy_gas,
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::Factory, Stage::Manager, Stage::Tasks, Stage::Agents];
        stages.extend(self.modules.iter().cloned().map(Stage::Module));
        stages
    }

    /// Run every stage in order, stopping at the first failure
    #[instrument(skip(self, session), fields(network = %session.chain_name()))]
    pub async fn run(&self, session: &NetworkSession) -> PipelineReport {
        let mut artifacts: Vec<ContractArtifact> = Vec::new();
        let mut failure = None;

        for stage in self.stages() {
            match self.deploy_stage(session, &stage, &artifacts).await {
                Ok(artifact) => {
                    info!(
                        network = %session.chain_name(),
                        stage = %stage,
                        code_id = artifact.code_id,
                        address = %artifact.address,
                        version = %artifact.version,
                        outcome = "SUCCESS",
                        "Deployed contract"
                    );
                    artifacts.push(artifact);
                }
                Err(e) => {
                    error!(
                        network = %session.chain_name(),
                        stage = %stage,
                        error = %e,
                        outcome = "ERROR",
                        "Deployment stage failed, skipping remaining stages"
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        PipelineReport {
            network: session.chain_name().to_string(),
            artifacts,
            failure,
        }
    }

    async fn deploy_stage(
        &self,
        session: &NetworkSession,
        stage: &Stage,
        deployed: &[ContractArtifact],
    ) -> Result<ContractArtifact, DeploymentError> {
        let name = stage.contract_name();
        let build = self
            .build
            .module(name)
            .await
            .map_err(|source| DeploymentError::BuildInfo {
                stage: name.to_string(),
                source,
            })?;

        let Some(kind) = stage.kind() else {
            return self.deploy_factory(session, &build).await;
        };

        let factory = deployed
            .iter()
            .find(|a| a.name == FACTORY)
            .ok_or_else(|| DeploymentError::MissingDependency {
                stage: name.to_string(),
                dependency: FACTORY.to_string(),
            })?;

        let (init_msg, funds) = self.instantiate_msg(session, stage, &build)?;
        RegistryClient::new(session, &factory.address, self.deploy_gas)
            .deploy_by_factory(kind, &build, &init_msg, &funds)
            .await
    }

    /// The factory has no parent registry and is instantiated directly,
    /// with the deployer as admin
    async fn deploy_factory(
        &self,
        session: &NetworkSession,
        build: &ModuleBuild,
    ) -> Result<ContractArtifact, DeploymentError> {
        let deployer = session.deployer();
        let upload = session
            .signer()
            .upload(deployer, build.wasm.clone())
            .await
            .map_err(|source| DeploymentError::Upload {
                stage: FACTORY.to_string(),
                source,
            })?;

        let msg = serde_json::to_value(FactoryInstantiateMsg {}).map_err(|e| DeploymentError::Encode {
            stage: FACTORY.to_string(),
            reason: e.to_string(),
        })?;
        let label = format!("{FACTORY}:{}", build.version);

        let instantiated = session
            .signer()
            .instantiate(deployer, upload.code_id, &msg, &label, Some(deployer), &[])
            .await
            .map_err(|source| match source {
                ChainError::AddressResolution(source) => DeploymentError::AddressResolutionFailed {
                    stage: FACTORY.to_string(),
                    source,
                },
                source => DeploymentError::Instantiate {
                    stage: FACTORY.to_string(),
                    source,
                },
            })?;

        Ok(ContractArtifact {
            name: FACTORY.to_string(),
            code_id: upload.code_id,
            address: instantiated.address,
            version: build.version,
            checksum: build.checksum.clone(),
            commit_id: build.commit_id.clone(),
        })
    }

    /// Instantiate payload and attached funds of a factory-deployed stage
    fn instantiate_msg(
        &self,
        session: &NetworkSession,
        stage: &Stage,
        build: &ModuleBuild,
    ) -> Result<(Value, Vec<Coin>), DeploymentError> {
        let name = stage.contract_name();
        let key = |contract: &str| -> Result<RegistryKey, DeploymentError> {
            self.build
                .version(contract)
                .map(|version| RegistryKey::new(contract, version))
                .map_err(|source| DeploymentError::BuildInfo {
                    stage: name.to_string(),
                    source,
                })
        };
        let version = build.version.to_string();
        let pause_admin = session.pause_admin().to_string();

        let (msg, funds) = match stage {
            Stage::Manager => (
                serde_json::to_value(ManagerInstantiateMsg {
                    version,
                    pause_admin,
                    treasury_addr: session.address(AccountRole::Treasury).to_string(),
                    croncat_tasks_key: key(TASKS)?,
                    croncat_agents_key: key(AGENTS)?,
                }),
                // the manager requires a non-empty deposit on creation
                vec![Coin::new(1, session.denom())],
            ),
            Stage::Tasks => (
                serde_json::to_value(TasksInstantiateMsg {
                    chain_name: session.network().bech32_prefix.clone(),
                    version,
                    pause_admin,
                    croncat_manager_key: key(MANAGER)?,
                    croncat_agents_key: key(AGENTS)?,
                }),
                Vec::new(),
            ),
            Stage::Agents => (
                serde_json::to_value(AgentsInstantiateMsg {
                    pause_admin,
                    version,
                    public_registration: false,
                    allowed_agents: vec![
                        session.address(AccountRole::Agent(1)).to_string(),
                        session.address(AccountRole::Agent(2)).to_string(),
                    ],
                    croncat_manager_key: key(MANAGER)?,
                    croncat_tasks_key: key(TASKS)?,
                }),
                Vec::new(),
            ),
            Stage::Module(_) | Stage::Factory => {
                (serde_json::to_value(LibraryInstantiateMsg {}), Vec::new())
            }
        };

        let msg = msg.map_err(|e| DeploymentError::Encode {
            stage: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok((msg, funds))
    }
}
