//! Build metadata port.

use async_trait::async_trait;

use crate::domain::errors::BuildInfoError;
use crate::domain::models::ContractVersion;

/// Compiled contract plus the provenance attached to its registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBuild {
    pub contract_name: String,
    pub wasm: Vec<u8>,
    pub version: ContractVersion,
    /// Hex sha256 of the wasm
    pub checksum: String,
    /// Source commit, `-` when unknown
    pub commit_id: String,
    pub changelog_url: String,
}

/// Source of compiled contracts, their versions and checksums
#[async_trait]
pub trait BuildSource: Send + Sync {
    /// Load the compiled module registered under `contract_name`
    async fn module(&self, contract_name: &str) -> Result<ModuleBuild, BuildInfoError>;

    /// Version of `contract_name` without loading its bytecode
    fn version(&self, contract_name: &str) -> Result<ContractVersion, BuildInfoError>;
}
