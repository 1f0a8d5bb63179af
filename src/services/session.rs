//! Network session: the unit of work for one network.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::errors::BootstrapError;
use crate::domain::models::{AccountBook, AccountRole, Config, Network};
use crate::domain::ports::{ChainQuerier, ChainSigner};
use crate::infrastructure::chain::{CosmosClient, EndpointSelector, Wallet};

/// Signing client, query client and named accounts of one network
///
/// Every pipeline stage and validator step receives the session explicitly;
/// nothing about a network lives in process-wide state.
#[derive(Clone)]
pub struct NetworkSession {
    network: Network,
    endpoint: String,
    accounts: AccountBook,
    pause_admin: String,
    signer: Arc<dyn ChainSigner>,
    querier: Arc<dyn ChainQuerier>,
}

impl std::fmt::Debug for NetworkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSession")
            .field("network", &self.network.chain_name)
            .field("endpoint", &self.endpoint)
            .field("accounts", &self.accounts)
            .field("pause_admin", &self.pause_admin)
            .finish_non_exhaustive()
    }
}

impl NetworkSession {
    /// Assemble a session from already constructed parts
    pub fn new(
        network: Network,
        endpoint: impl Into<String>,
        accounts: AccountBook,
        pause_admin: impl Into<String>,
        signer: Arc<dyn ChainSigner>,
        querier: Arc<dyn ChainQuerier>,
    ) -> Self {
        Self {
            network,
            endpoint: endpoint.into(),
            accounts,
            pause_admin: pause_admin.into(),
            signer,
            querier,
        }
    }

    /// Derive accounts, select a live endpoint and connect the clients
    ///
    /// The pause admin is the configured multisig of the network when one is
    /// set; the derived `pause_admin` account is used otherwise.
    #[instrument(skip(network, config), fields(network = %network.chain_name))]
    pub async fn open(network: &Network, config: &Config) -> Result<Self, BootstrapError> {
        let seed = config.seed_phrase.as_ref().ok_or_else(|| {
            BootstrapError::WalletDerivationFailed("SEED_PHRASE is not set".to_string())
        })?;

        let configured_admin = config.pause_admin(&network.chain_name);
        let roles: Vec<AccountRole> = AccountRole::all()
            .into_iter()
            .filter(|role| *role != AccountRole::PauseAdmin || configured_admin.is_none())
            .collect();

        let wallet = Wallet::derive(seed, &network.bech32_prefix, &roles)?;
        let accounts = wallet.account_book();
        let pause_admin = configured_admin
            .or_else(|| accounts.address(AccountRole::PauseAdmin))
            .unwrap_or_default()
            .to_string();

        let selector = EndpointSelector::new(Duration::from_millis(config.endpoint.probe_timeout_ms))?;
        let endpoint = selector.select(&network.chain_name, &network.rpc).await?;

        let client = Arc::new(CosmosClient::connect(&endpoint, network, Arc::new(wallet), config).await?);

        info!(
            network = %network.chain_name,
            endpoint = %endpoint,
            deployer = %accounts.deployer(),
            accounts = accounts.len(),
            "Opened network session"
        );

        Ok(Self::new(
            network.clone(),
            endpoint,
            accounts,
            pause_admin,
            client.clone(),
            client,
        ))
    }

    pub const fn network(&self) -> &Network {
        &self.network
    }

    pub fn chain_name(&self) -> &str {
        &self.network.chain_name
    }

    pub fn denom(&self) -> &str {
        self.network.denom()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub const fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn deployer(&self) -> &str {
        self.accounts.deployer()
    }

    /// Address of a derived role; empty when the role was not derived
    pub fn address(&self, role: AccountRole) -> &str {
        self.accounts.address(role).unwrap_or_default()
    }

    pub fn pause_admin(&self) -> &str {
        &self.pause_admin
    }

    pub fn signer(&self) -> &dyn ChainSigner {
        self.signer.as_ref()
    }

    pub fn querier(&self) -> &dyn ChainQuerier {
        self.querier.as_ref()
    }
}
