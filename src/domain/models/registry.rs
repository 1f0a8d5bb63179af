//! Message shapes of the factory contract: deploy/proxy executes and the
//! versioned registry queries. Field names are part of the on-chain contract
//! and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::chain::Coin;

/// Truncated semantic version `(major, minor)`, serialized as `[major, minor]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u8; 2]", into = "[u8; 2]")]
pub struct ContractVersion {
    pub major: u8,
    pub minor: u8,
}

impl ContractVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for ContractVersion {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl From<[u8; 2]> for ContractVersion {
    fn from([major, minor]: [u8; 2]) -> Self {
        Self { major, minor }
    }
}

impl From<ContractVersion> for [u8; 2] {
    fn from(version: ContractVersion) -> Self {
        [version.major, version.minor]
    }
}

impl fmt::Display for ContractVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ContractVersion {
    type Err = String;

    /// Accepts `major.minor` or a full `major.minor.patch` semver string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u8>().ok())
                .ok_or_else(|| format!("Invalid contract version: {s}"))
        };
        let major = next()?;
        let minor = next()?;
        Ok(Self { major, minor })
    }
}

/// Registry key `[contract_name, [major, minor]]` used by contracts to resolve
/// each other through the factory instead of by raw address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryKey(pub String, pub ContractVersion);

impl RegistryKey {
    pub fn new(name: impl Into<String>, version: ContractVersion) -> Self {
        Self(name.into(), version)
    }
}

/// Module kind understood by the factory's `deploy` handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Manager,
    Tasks,
    Agents,
    Library,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::Tasks => write!(f, "tasks"),
            Self::Agents => write!(f, "agents"),
            Self::Library => write!(f, "library"),
        }
    }
}

/// Metadata and base64 instantiate payload of a module deployed via the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInstantiateInfo {
    pub code_id: u64,
    pub version: ContractVersion,
    pub commit_id: String,
    pub checksum: String,
    pub changelog_url: String,
    pub schema: String,
    /// Base64-encoded JSON instantiate message
    pub msg: String,
    pub contract_name: String,
}

/// Sub-message forwarded by the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyMsg {
    Execute {
        contract_addr: String,
        /// Base64-encoded JSON execute message
        msg: String,
        funds: Vec<Coin>,
    },
}

/// Execute messages of the factory contract used by the deployer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryExecuteMsg {
    Deploy {
        kind: ModuleKind,
        module_instantiate_info: ModuleInstantiateInfo,
    },
    Proxy {
        msg: ProxyMsg,
    },
}

/// Registry queries of the factory contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryQueryMsg {
    LatestContracts {},
    LatestContract { contract_name: String },
    VersionsByContractName { contract_name: String },
    ContractNames {},
    AllEntries {},
}

/// Registry entry metadata as returned by the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    #[serde(default)]
    pub kind: Option<ModuleKind>,
    pub code_id: u64,
    pub contract_addr: String,
    pub version: ContractVersion,
    #[serde(default)]
    pub commit_id: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub changelog_url: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

/// `{contract_name, metadata}` pair of `latest_contracts` / `all_entries`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResponse {
    pub contract_name: String,
    pub metadata: ContractMetadata,
}

/// Response of `latest_contract`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestContractResponse {
    pub metadata: Option<ContractMetadata>,
}
