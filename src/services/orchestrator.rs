//! Multi-network orchestration.
//!
//! Each selected network runs as one independent unit of work: sessions
//! are opened concurrently, and a failure on one network is logged and
//! reported without touching the others. Within a network everything is
//! sequential.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::errors::{BootstrapError, RegistryQueryError};
use crate::domain::models::{
    Config, ContractArtifact, ContractMetadata, EntryResponse, FactoryRecord, Network, TxResponse,
};
use crate::domain::ports::BuildSource;
use crate::infrastructure::artifacts::ArtifactStore;
use crate::infrastructure::build_info::ArtifactsBuildSource;
use crate::services::funding::{AccountBalance, EqualizeResult, FundingEqualizer};
use crate::services::pipeline::{DeploymentPipeline, AGENTS, FACTORY};
use crate::services::registry_client::RegistryClient;
use crate::services::session::NetworkSession;
use crate::services::validator::{
    sweep_tasks, DeployedContracts, LifecycleValidator, SweepReport, ValidationReport,
};

/// Opens the session of one network
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self, network: &Network) -> Result<NetworkSession, BootstrapError>;
}

/// Sessions backed by live RPC endpoints
#[derive(Debug, Clone)]
pub struct ChainSessions {
    config: Arc<Config>,
}

impl ChainSessions {
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionProvider for ChainSessions {
    async fn open(&self, network: &Network) -> Result<NetworkSession, BootstrapError> {
        NetworkSession::open(network, &self.config).await
    }
}

/// Outcome of one command on one network
#[derive(Debug)]
pub struct NetworkRun<T> {
    pub network: String,
    pub outcome: Result<T>,
}

impl<T> NetworkRun<T> {
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// What a deploy run did on one network
#[derive(Debug, Serialize)]
pub struct NetworkDeployment {
    pub funding: EqualizeResult,
    pub artifacts: Vec<ContractArtifact>,
    /// Stage error that ended the pipeline early
    pub failure: Option<String>,
    pub artifacts_path: Option<PathBuf>,
    /// Writing the network's artifact file failed; the artifacts above are still valid
    pub artifacts_error: Option<String>,
}

impl NetworkDeployment {
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of `deploy` across networks
#[derive(Debug)]
pub struct DeployReport {
    pub networks: Vec<NetworkRun<NetworkDeployment>>,
    pub factories: Vec<FactoryRecord>,
    pub factories_path: Option<PathBuf>,
}

/// Named account balances of one network
#[derive(Debug, Serialize)]
pub struct AccountsView {
    pub denom: String,
    pub balances: Vec<AccountBalance>,
    /// Deployer balance needed to fund every other account to the target
    pub required_deployer_balance: u128,
}

impl AccountsView {
    pub fn deployer_underfunded(&self) -> bool {
        self.balances
            .first()
            .is_none_or(|deployer| deployer.balance < self.required_deployer_balance)
    }
}

/// Registry contents of one network
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryView {
    Latest {
        factory: String,
        entries: Vec<EntryResponse>,
    },
    Versions {
        factory: String,
        contract_name: String,
        versions: Vec<ContractMetadata>,
    },
}

/// Runs commands across the selected networks
pub struct Orchestrator {
    config: Arc<Config>,
    store: ArtifactStore,
    build: Arc<dyn BuildSource>,
    sessions: Arc<dyn SessionProvider>,
}

impl Orchestrator {
    /// Orchestrator over live networks and the configured artifacts directory
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let store = ArtifactStore::new(config.artifacts.dir.clone());
        let build = Arc::new(ArtifactsBuildSource::new(
            config.artifacts.clone(),
            config.contracts.clone(),
        ));
        let sessions = Arc::new(ChainSessions::new(config.clone()));
        Self::with_parts(config, store, build, sessions)
    }

    pub fn with_parts(
        config: Arc<Config>,
        store: ArtifactStore,
        build: Arc<dyn BuildSource>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            config,
            store,
            build,
            sessions,
        }
    }

    pub const fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Networks targeted by `selection`, or every supported network
    pub fn networks(&self, selection: Option<&str>) -> Result<Vec<Network>> {
        let networks = self
            .config
            .resolve_networks(selection)
            .map_err(|name| anyhow!("Unknown network: {name}"))?;
        if networks.is_empty() {
            return Err(anyhow!("No networks selected"));
        }
        Ok(networks)
    }

    /// Fund, deploy and persist every selected network, then record the factories
    pub async fn deploy(&self, selection: Option<&str>) -> Result<DeployReport> {
        let networks = self.networks(selection)?;
        let runs = self
            .per_network(networks, |session| async move { self.deploy_network(&session).await })
            .await;

        let factories: Vec<FactoryRecord> = runs
            .iter()
            .filter_map(|run| {
                let deployment = run.outcome.as_ref().ok()?;
                let factory = deployment.artifacts.iter().find(|a| a.name == FACTORY)?;
                Some(FactoryRecord {
                    chain_name: run.network.clone(),
                    code_id: factory.code_id,
                    address: factory.address.clone(),
                })
            })
            .collect();

        let factories_path = if factories.is_empty() {
            None
        } else {
            match self.store.save_factories(&factories).await {
                Ok(path) => Some(path),
                Err(e) => {
                    error!(error = %e, outcome = "ERROR", "Saving deployed factories failed");
                    None
                }
            }
        };

        Ok(DeployReport {
            networks: runs,
            factories,
            factories_path,
        })
    }

    async fn deploy_network(&self, session: &NetworkSession) -> Result<NetworkDeployment> {
        let target = u128::from(self.config.funding.target_amount);
        let funding = FundingEqualizer::new(target)
            .equalize(session)
            .await
            .context("Funding accounts failed, nothing was deployed")?;

        let pipeline = DeploymentPipeline::new(
            self.build.as_ref(),
            self.config.contracts.modules.clone(),
            self.config.gas.deploy,
        );
        let report = pipeline.run(session).await;

        // a failed first stage leaves nothing worth replacing the previous records with
        let (artifacts_path, artifacts_error) = if report.artifacts.is_empty() {
            (None, None)
        } else {
            let records: Vec<_> = report.artifacts.iter().map(ContractArtifact::record).collect();
            match self.store.save_network(session.chain_name(), &records).await {
                Ok(path) => (Some(path), None),
                Err(e) => {
                    error!(
                        network = %session.chain_name(),
                        error = %e,
                        outcome = "ERROR",
                        "Saving deployed contracts failed"
                    );
                    (None, Some(e.to_string()))
                }
            }
        };

        Ok(NetworkDeployment {
            funding,
            artifacts: report.artifacts,
            failure: report.failure.map(|e| e.to_string()),
            artifacts_path,
            artifacts_error,
        })
    }

    /// Run the lifecycle scenario on every selected network
    pub async fn validate(&self, selection: Option<&str>) -> Result<Vec<NetworkRun<ValidationReport>>> {
        let networks = self.networks(selection)?;
        Ok(self
            .per_network(networks, |session| async move {
                let factory = self.factory(session.chain_name()).await?;
                let registry = RegistryClient::new(&session, &factory, self.config.gas.deploy);
                let contracts = DeployedContracts::resolve(&registry).await?;
                let validator = LifecycleValidator::new(&self.config.validator, self.config.gas.deploy);
                anyhow::Ok(validator.run(&session, &contracts).await)
            })
            .await)
    }

    /// Balances of the named accounts on every selected network
    pub async fn accounts(&self, selection: Option<&str>) -> Result<Vec<NetworkRun<AccountsView>>> {
        let networks = self.networks(selection)?;
        let target = u128::from(self.config.funding.target_amount);
        Ok(self
            .per_network(networks, |session| async move {
                let balances = FundingEqualizer::new(target).read_balances(&session).await?;
                let others = balances.len().saturating_sub(1) as u128;
                anyhow::Ok(AccountsView {
                    denom: session.denom().to_string(),
                    balances,
                    required_deployer_balance: target.saturating_mul(others),
                })
            })
            .await)
    }

    /// Allow `agent` to register with the agents contract of its network
    ///
    /// Without an explicit network the one whose prefix matches the address
    /// is used.
    pub async fn whitelist(&self, agent: &str, selection: Option<&str>) -> Result<NetworkRun<TxResponse>> {
        let network = match selection {
            Some(name) => self
                .config
                .network(name)
                .ok_or_else(|| anyhow!("Unknown network: {name}"))?,
            None => self
                .config
                .network_for_address(agent)
                .ok_or_else(|| anyhow!("No configured network uses the prefix of {agent}"))?,
        };

        let mut runs = self
            .per_network(vec![network], |session| async move {
                let factory = self.factory(session.chain_name()).await?;
                let registry = RegistryClient::new(&session, &factory, self.config.gas.deploy);
                let agents = registry.contract_address(AGENTS).await?;
                anyhow::Ok(registry.whitelist_agent(&agents, agent).await?)
            })
            .await;
        runs.pop().ok_or_else(|| anyhow!("No network run"))
    }

    /// Registry contents, or every version of one contract
    pub async fn registry(
        &self,
        selection: Option<&str>,
        contract_name: Option<&str>,
    ) -> Result<Vec<NetworkRun<RegistryView>>> {
        let networks = self.networks(selection)?;
        Ok(self
            .per_network(networks, |session| async move {
                let factory = self.factory(session.chain_name()).await?;
                let registry = RegistryClient::new(&session, &factory, self.config.gas.deploy);
                anyhow::Ok(match contract_name {
                    Some(name) => RegistryView::Versions {
                        versions: registry.versions_by_name(name).await?,
                        contract_name: name.to_string(),
                        factory,
                    },
                    None => RegistryView::Latest {
                        entries: registry.latest_contracts().await?,
                        factory,
                    },
                })
            })
            .await)
    }

    /// Remove every task not owned by the factory
    pub async fn cleanup(&self, selection: Option<&str>) -> Result<Vec<NetworkRun<SweepReport>>> {
        let networks = self.networks(selection)?;
        Ok(self
            .per_network(networks, |session| async move {
                let factory = self.factory(session.chain_name()).await?;
                let registry = RegistryClient::new(&session, &factory, self.config.gas.deploy);
                let contracts = DeployedContracts::resolve(&registry).await?;
                anyhow::Ok(sweep_tasks(&session, &contracts).await?)
            })
            .await)
    }

    async fn factory(&self, chain_name: &str) -> Result<String> {
        let factory = self
            .store
            .factory(chain_name)
            .await?
            .ok_or_else(|| RegistryQueryError::NoFactory(chain_name.to_string()))?;
        Ok(factory.address)
    }

    /// Open a session per network concurrently and run `work` on each
    ///
    /// Bootstrap failures exclude the network; they never reach `work`.
    async fn per_network<T, F, Fut>(&self, networks: Vec<Network>, work: F) -> Vec<NetworkRun<T>>
    where
        F: Fn(NetworkSession) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let work = &work;
        join_all(networks.into_iter().map(|network| async move {
            let outcome = match self.sessions.open(&network).await {
                Ok(session) => work(session).await,
                Err(e) => {
                    warn!(network = %network.chain_name, error = %e, outcome = "ERROR", "Skipping network");
                    Err(e.into())
                }
            };
            match &outcome {
                Ok(_) => info!(network = %network.chain_name, outcome = "SUCCESS", "Network finished"),
                Err(e) => error!(network = %network.chain_name, error = format!("{e:#}"), outcome = "ERROR", "Network failed"),
            }
            NetworkRun {
                network: network.chain_name,
                outcome,
            }
        }))
        .await
    }
}
