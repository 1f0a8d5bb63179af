use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use super::network::{FeeToken, Network};

/// Main configuration structure for the deployer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Known networks; a run targets a subset of them
    #[serde(default = "default_networks")]
    pub networks: Vec<Network>,

    /// Comma separated chain names targeted when no network is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_networks: Option<String>,

    /// BIP-39 mnemonic all session accounts are derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_phrase: Option<SeedPhrase>,

    /// Replaces every candidate endpoint of the selected networks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_endpoint: Option<String>,

    /// Overrides the fee denomination of the selected networks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denom: Option<String>,

    /// Overrides the bech32 prefix of the selected networks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Multisig pause admin per chain name
    #[serde(default)]
    pub pause_admins: BTreeMap<String, String>,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub contracts: ContractsConfig,

    #[serde(default)]
    pub gas: GasConfig,

    #[serde(default)]
    pub funding: FundingConfig,

    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Retry policy of read-only chain queries
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub tx: TxConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            networks: default_networks(),
            supported_networks: None,
            seed_phrase: None,
            rpc_endpoint: None,
            denom: None,
            prefix: None,
            pause_admins: BTreeMap::new(),
            artifacts: ArtifactsConfig::default(),
            contracts: ContractsConfig::default(),
            gas: GasConfig::default(),
            funding: FundingConfig::default(),
            endpoint: EndpointConfig::default(),
            retry: RetryConfig::default(),
            tx: TxConfig::default(),
            validator: ValidatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Network by chain name, with the endpoint, denom and prefix overrides applied
    pub fn network(&self, chain_name: &str) -> Option<Network> {
        self.networks
            .iter()
            .find(|n| n.chain_name.eq_ignore_ascii_case(chain_name))
            .map(|n| self.with_overrides(n.clone()))
    }

    /// Networks a run targets: the named one, or every supported network
    ///
    /// Unknown names in `supported_networks` are returned as the error value.
    pub fn resolve_networks(&self, selection: Option<&str>) -> Result<Vec<Network>, String> {
        if let Some(name) = selection {
            return self.network(name).map(|n| vec![n]).ok_or_else(|| name.to_string());
        }
        match self.supported_network_names() {
            Some(names) => names
                .iter()
                .map(|name| self.network(name).ok_or_else(|| name.clone()))
                .collect(),
            None => Ok(self
                .networks
                .iter()
                .map(|n| self.with_overrides(n.clone()))
                .collect()),
        }
    }

    /// Network whose bech32 prefix, after the `PREFIX` override, matches the
    /// human readable part of `address`
    pub fn network_for_address(&self, address: &str) -> Option<Network> {
        let (hrp, _) = address.rsplit_once('1')?;
        self.networks
            .iter()
            .map(|n| self.with_overrides(n.clone()))
            .find(|n| n.bech32_prefix == hrp)
    }

    pub fn pause_admin(&self, chain_name: &str) -> Option<&str> {
        self.pause_admins
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(chain_name))
            .map(|(_, address)| address.as_str())
            .filter(|address| !address.is_empty())
    }

    /// Names listed in `supported_networks`, first occurrence of each kept
    fn supported_network_names(&self) -> Option<Vec<String>> {
        let mut seen = HashSet::new();
        let names: Vec<String> = self
            .supported_networks
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty() && seen.insert(name.to_ascii_lowercase()))
            .map(ToString::to_string)
            .collect();
        (!names.is_empty()).then_some(names)
    }

    fn with_overrides(&self, mut network: Network) -> Network {
        if let Some(endpoint) = &self.rpc_endpoint {
            network.rpc = vec![endpoint.clone()];
        }
        if let Some(denom) = &self.denom {
            network.fee_token.denom.clone_from(denom);
        }
        if let Some(prefix) = &self.prefix {
            network.bech32_prefix.clone_from(prefix);
        }
        network
    }
}

fn default_networks() -> Vec<Network> {
    vec![
        Network {
            chain_name: "junotestnet".to_string(),
            pretty_name: "Juno Testnet".to_string(),
            chain_id: "uni-6".to_string(),
            bech32_prefix: "juno".to_string(),
            rpc: vec![
                "https://rpc.uni.junonetwork.io".to_string(),
                "https://juno-testnet-rpc.polkachu.com".to_string(),
            ],
            fee_token: FeeToken {
                denom: "ujunox".to_string(),
                average_gas_price: 0.04,
            },
        },
        Network {
            chain_name: "stargazetestnet".to_string(),
            pretty_name: "Stargaze Testnet".to_string(),
            chain_id: "elgafar-1".to_string(),
            bech32_prefix: "stars".to_string(),
            rpc: vec!["https://rpc.elgafar-1.stargaze-apis.com".to_string()],
            fee_token: FeeToken {
                denom: "ustars".to_string(),
                average_gas_price: 0.04,
            },
        },
        Network {
            chain_name: "osmosistestnet".to_string(),
            pretty_name: "Osmosis Testnet".to_string(),
            chain_id: "osmo-test-5".to_string(),
            bech32_prefix: "osmo".to_string(),
            rpc: vec!["https://rpc.osmotest5.osmosis.zone".to_string()],
            fee_token: FeeToken {
                denom: "uosmo".to_string(),
                average_gas_price: 0.025,
            },
        },
    ]
}

/// Mnemonic wrapper that never prints its content
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedPhrase(String);

impl SeedPhrase {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(phrase.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedPhrase(<redacted>)")
    }
}

/// Location of compiled contracts and their checksums
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArtifactsConfig {
    /// Directory holding `*.wasm`, `checksums.txt` and the deployment records
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,

    /// Prefix of wasm file names (`<prefix><contract>.wasm`)
    #[serde(default = "default_wasm_prefix")]
    pub wasm_prefix: String,

    #[serde(default = "default_checksum_file")]
    pub checksum_file: String,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_wasm_prefix() -> String {
    "croncat_".to_string()
}

fn default_checksum_file() -> String {
    "checksums.txt".to_string()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            wasm_prefix: default_wasm_prefix(),
            checksum_file: default_checksum_file(),
        }
    }
}

/// Contract versions and provenance metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContractsConfig {
    /// `major.minor` (or full semver) per contract name
    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    /// Version of contracts missing from `versions`
    #[serde(default = "default_contract_version")]
    pub default_version: String,

    #[serde(default = "default_changelog_url")]
    pub changelog_url: String,

    /// Commit id attached to every module; `git rev-parse HEAD` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,

    /// Library modules deployed after the core contracts
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
}

fn default_contract_version() -> String {
    "0.1".to_string()
}

fn default_changelog_url() -> String {
    "https://github.com/croncats".to_string()
}

fn default_modules() -> Vec<String> {
    ["mod_balances", "mod_dao", "mod_generic", "mod_nft"]
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            versions: BTreeMap::new(),
            default_version: default_contract_version(),
            changelog_url: default_changelog_url(),
            commit_id: None,
            modules: default_modules(),
        }
    }
}

/// Gas limits per message type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GasConfig {
    #[serde(default = "default_upload_gas")]
    pub upload: u64,

    /// Direct instantiation (factory only)
    #[serde(default = "default_instantiate_gas")]
    pub instantiate: u64,

    /// Factory `deploy` executes
    #[serde(default = "default_deploy_gas")]
    pub deploy: u64,

    /// Every other contract execute
    #[serde(default = "default_execute_gas")]
    pub execute: u64,

    /// Bank transfers
    #[serde(default = "default_send_gas")]
    pub send: u64,
}

const fn default_upload_gas() -> u64 {
    4_400_000
}

const fn default_instantiate_gas() -> u64 {
    700_000
}

const fn default_deploy_gas() -> u64 {
    555_000
}

const fn default_execute_gas() -> u64 {
    999_000
}

const fn default_send_gas() -> u64 {
    200_000
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            upload: default_upload_gas(),
            instantiate: default_instantiate_gas(),
            deploy: default_deploy_gas(),
            execute: default_execute_gas(),
            send: default_send_gas(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FundingConfig {
    /// Balance every non-deployer account is topped up to, in the fee denom
    #[serde(default = "default_target_amount")]
    pub target_amount: u64,
}

const fn default_target_amount() -> u64 {
    5_000_000
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            target_amount: default_target_amount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointConfig {
    /// Timeout of a single liveness probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

const fn default_probe_timeout_ms() -> u64 {
    5_000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Transaction broadcast settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TxConfig {
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long a broadcast transaction may stay unindexed
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub memo: String,
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

const fn default_confirm_timeout_ms() -> u64 {
    60_000
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            memo: String::new(),
        }
    }
}

/// Lifecycle scenario parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidatorConfig {
    /// Funds attached to the factory-owned tick task
    #[serde(default = "default_factory_task_funds")]
    pub factory_task_funds: u64,

    /// Funds attached to each deployer-owned task, in creation order
    #[serde(default = "default_task_funds")]
    pub task_funds: Vec<u64>,

    /// Gas limit of every scheduled action
    #[serde(default = "default_action_gas_limit")]
    pub action_gas_limit: u64,

    /// Upper bound of the wait for the second agent's nomination
    #[serde(default = "default_nomination_timeout_ms")]
    pub nomination_timeout_ms: u64,

    #[serde(default = "default_nomination_initial_backoff_ms")]
    pub nomination_initial_backoff_ms: u64,

    #[serde(default = "default_nomination_max_backoff_ms")]
    pub nomination_max_backoff_ms: u64,
}

const fn default_factory_task_funds() -> u64 {
    60_000
}

fn default_task_funds() -> Vec<u64> {
    vec![100_000, 260_000, 460_000]
}

const fn default_action_gas_limit() -> u64 {
    75_000
}

const fn default_nomination_timeout_ms() -> u64 {
    60_000
}

const fn default_nomination_initial_backoff_ms() -> u64 {
    2_000
}

const fn default_nomination_max_backoff_ms() -> u64 {
    12_000
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            factory_task_funds: default_factory_task_funds(),
            task_funds: default_task_funds(),
            action_gas_limit: default_action_gas_limit(),
            nomination_timeout_ms: default_nomination_timeout_ms(),
            nomination_initial_backoff_ms: default_nomination_initial_backoff_ms(),
            nomination_max_backoff_ms: default_nomination_max_backoff_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory of rolling JSON log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
