//! Instantiate payloads of the contracts deployed through the factory.
//!
//! Cross-contract references are registry keys, never raw addresses, so a
//! later upgrade registered in the factory is picked up without migration.

use serde::{Deserialize, Serialize};

use super::registry::RegistryKey;

/// Factory instantiate message, no parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryInstantiateMsg {}

/// Instantiate message of library modules (`mod_*`), no parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInstantiateMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerInstantiateMsg {
    /// `major.minor` version stored by the contract
    pub version: String,
    pub pause_admin: String,
    pub treasury_addr: String,
    pub croncat_tasks_key: RegistryKey,
    pub croncat_agents_key: RegistryKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksInstantiateMsg {
    /// Prefix of every task hash, the network's bech32 prefix
    pub chain_name: String,
    pub version: String,
    pub pause_admin: String,
    pub croncat_manager_key: RegistryKey,
    pub croncat_agents_key: RegistryKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsInstantiateMsg {
    pub pause_admin: String,
    pub version: String,
    pub public_registration: bool,
    /// Agents allowed to register while registration is not public
    pub allowed_agents: Vec<String>,
    pub croncat_manager_key: RegistryKey,
    pub croncat_tasks_key: RegistryKey,
}
