use serde::{Deserialize, Serialize};

use super::registry::ContractVersion;

/// Contract deployed by one pipeline stage
///
/// Created when the stage completes and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractArtifact {
    /// Registry name (`factory`, `manager`, `tasks`, `agents`, `mod_*`)
    pub name: String,
    pub code_id: u64,
    pub address: String,
    pub version: ContractVersion,
    pub checksum: String,
    pub commit_id: String,
}

impl ContractArtifact {
    /// Persisted `{name, code_id, address}` projection
    pub fn record(&self) -> ArtifactRecord {
        ArtifactRecord {
            name: self.name.clone(),
            code_id: self.code_id,
            address: self.address.clone(),
        }
    }
}

/// Element of `<network>-deployed_contracts.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub code_id: u64,
    pub address: String,
}

/// Element of `deployed_factories.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryRecord {
    pub chain_name: String,
    pub code_id: u64,
    pub address: String,
}

impl FactoryRecord {
    /// Factory entry of a network's artifact list, if that stage completed
    pub fn from_records(chain_name: &str, records: &[ArtifactRecord]) -> Option<Self> {
        records
            .iter()
            .find(|record| record.name == "factory")
            .map(|record| Self {
                chain_name: chain_name.to_string(),
                code_id: record.code_id,
                address: record.address.clone(),
            })
    }
}
