//! Factory registry client: deploy through the factory, proxy admin calls
//! and read the versioned registry.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::domain::errors::{ChainError, DeploymentError, RegistryQueryError};
use crate::domain::models::{
    AgentsExecuteMsg, Coin, ContractArtifact, ContractMetadata, EntryResponse, FactoryExecuteMsg,
    FactoryQueryMsg, LatestContractResponse, ModuleInstantiateInfo, ModuleKind, ProxyMsg,
    TxResponse,
};
use crate::domain::ports::{query_smart, ModuleBuild};
use crate::services::session::NetworkSession;

/// Base64 of the JSON encoding of `msg`, as embedded in factory messages
pub fn encode_msg<T: Serialize + ?Sized>(msg: &T) -> Result<String, serde_json::Error> {
    Ok(STANDARD.encode(serde_json::to_vec(msg)?))
}

/// Client of one deployed factory contract
#[derive(Debug, Clone, Copy)]
pub struct RegistryClient<'a> {
    session: &'a NetworkSession,
    factory: &'a str,
    deploy_gas: u64,
}

impl<'a> RegistryClient<'a> {
    /// `deploy_gas` is the gas limit of `deploy` and `proxy` executes
    pub const fn new(session: &'a NetworkSession, factory: &'a str, deploy_gas: u64) -> Self {
        Self {
            session,
            factory,
            deploy_gas,
        }
    }

    pub const fn factory(&self) -> &str {
        self.factory
    }

    /// Upload `build`, then have the factory instantiate and register it
    ///
    /// The new address is read from the transaction's `instantiate` event
    /// for the uploaded code id; a missing or ambiguous event fails with
    /// `AddressResolutionFailed`.
    #[instrument(skip(self, build, init_msg, funds), fields(network = %self.session.chain_name(), stage = %build.contract_name))]
    pub async fn deploy_by_factory(
        &self,
        kind: ModuleKind,
        build: &ModuleBuild,
        init_msg: &Value,
        funds: &[Coin],
    ) -> Result<ContractArtifact, DeploymentError> {
        let stage = build.contract_name.clone();
        let deployer = self.session.deployer();

        let upload = self
            .session
            .signer()
            .upload(deployer, build.wasm.clone())
            .await
            .map_err(|source| DeploymentError::Upload {
                stage: stage.clone(),
                source,
            })?;
        debug!(code_id = upload.code_id, tx_hash = %upload.tx.hash, "Uploaded code");

        let msg = encode_msg(init_msg).map_err(|e| DeploymentError::Encode {
            stage: stage.clone(),
            reason: e.to_string(),
        })?;
        let deploy = FactoryExecuteMsg::Deploy {
            kind,
            module_instantiate_info: ModuleInstantiateInfo {
                code_id: upload.code_id,
                version: build.version,
                commit_id: build.commit_id.clone(),
                checksum: build.checksum.clone(),
                changelog_url: build.changelog_url.clone(),
                schema: String::new(),
                msg,
                contract_name: build.contract_name.clone(),
            },
        };
        let deploy = serde_json::to_value(&deploy).map_err(|e| DeploymentError::Encode {
            stage: stage.clone(),
            reason: e.to_string(),
        })?;

        let tx = self
            .session
            .signer()
            .execute(deployer, self.factory, &deploy, funds, Some(self.deploy_gas))
            .await
            .map_err(|source| DeploymentError::Instantiate {
                stage: stage.clone(),
                source,
            })?;

        let address = tx
            .instantiated_address(Some(upload.code_id))
            .map_err(|source| DeploymentError::AddressResolutionFailed {
                stage: stage.clone(),
                source,
            })?;

        Ok(ContractArtifact {
            name: build.contract_name.clone(),
            code_id: upload.code_id,
            address,
            version: build.version,
            checksum: build.checksum.clone(),
            commit_id: build.commit_id.clone(),
        })
    }

    /// Execute `msg` on `target` with the factory as immediate caller
    ///
    /// `funds` are attached to the forwarded message and sent along with the
    /// outer call so the factory can pass them on.
    pub async fn proxy_call<M: Serialize + Sync>(
        &self,
        sender: &str,
        target: &str,
        msg: &M,
        funds: &[Coin],
    ) -> Result<TxResponse, ChainError> {
        let proxy = FactoryExecuteMsg::Proxy {
            msg: ProxyMsg::Execute {
                contract_addr: target.to_string(),
                msg: encode_msg(msg)?,
                funds: funds.to_vec(),
            },
        };
        let proxy = serde_json::to_value(&proxy)?;
        self.session
            .signer()
            .execute(sender, self.factory, &proxy, funds, Some(self.deploy_gas))
            .await
    }

    /// Add `agent` to the allow-list of the agents contract
    #[instrument(skip(self), fields(network = %self.session.chain_name()))]
    pub async fn whitelist_agent(&self, agents: &str, agent: &str) -> Result<TxResponse, ChainError> {
        let msg = AgentsExecuteMsg::AddAgentToWhitelist {
            agent_address: agent.to_string(),
        };
        match self.proxy_call(self.session.deployer(), agents, &msg, &[]).await {
            Ok(tx) => {
                info!(agent, tx_hash = %tx.hash, outcome = "SUCCESS", "Whitelisted agent");
                Ok(tx)
            }
            Err(e) => {
                error!(agent, error = %e, outcome = "ERROR", "Whitelisting agent failed");
                Err(e)
            }
        }
    }

    pub async fn latest_contracts(&self) -> Result<Vec<EntryResponse>, RegistryQueryError> {
        self.query("latest_contracts", &FactoryQueryMsg::LatestContracts {})
            .await
    }

    pub async fn latest_contract(&self, contract_name: &str) -> Result<Option<ContractMetadata>, RegistryQueryError> {
        let response: LatestContractResponse = self
            .query(
                "latest_contract",
                &FactoryQueryMsg::LatestContract {
                    contract_name: contract_name.to_string(),
                },
            )
            .await?;
        Ok(response.metadata)
    }

    pub async fn versions_by_name(&self, contract_name: &str) -> Result<Vec<ContractMetadata>, RegistryQueryError> {
        self.query(
            "versions_by_contract_name",
            &FactoryQueryMsg::VersionsByContractName {
                contract_name: contract_name.to_string(),
            },
        )
        .await
    }

    pub async fn contract_names(&self) -> Result<Vec<String>, RegistryQueryError> {
        self.query("contract_names", &FactoryQueryMsg::ContractNames {})
            .await
    }

    pub async fn all_entries(&self) -> Result<Vec<EntryResponse>, RegistryQueryError> {
        self.query("all_entries", &FactoryQueryMsg::AllEntries {})
            .await
    }

    /// Address of the latest registered version of `contract_name`
    pub async fn contract_address(&self, contract_name: &str) -> Result<String, RegistryQueryError> {
        self.latest_contracts()
            .await?
            .into_iter()
            .find(|entry| entry.contract_name == contract_name)
            .map(|entry| entry.metadata.contract_addr)
            .ok_or_else(|| RegistryQueryError::MissingContract(contract_name.to_string()))
    }

    async fn query<R: DeserializeOwned>(
        &self,
        name: &str,
        msg: &FactoryQueryMsg,
    ) -> Result<R, RegistryQueryError> {
        query_smart(self.session.querier(), self.factory, msg)
            .await
            .map_err(|source| RegistryQueryError::Query {
                query: name.to_string(),
                source,
            })
    }
}
