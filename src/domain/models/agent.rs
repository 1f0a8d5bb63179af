use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Agent status as observed through the agents contract
///
/// `Unregistered` is never returned by the contract; it stands for a
/// `get_agent` response without an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Pending,
    Nominated,
    Unregistered,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Pending => write!(f, "pending"),
            Self::Nominated => write!(f, "nominated"),
            Self::Unregistered => write!(f, "unregistered"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "nominated" => Ok(Self::Nominated),
            "unregistered" => Ok(Self::Unregistered),
            _ => Err(anyhow::anyhow!("Invalid agent status: {s}")),
        }
    }
}

/// On-chain agent record returned by `get_agent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub status: AgentStatus,

    /// Where rewards get transferred
    pub payable_account_id: String,

    /// Accrued reward balance (Uint128 as string)
    #[serde(default)]
    pub balance: String,

    #[serde(default)]
    pub total_tasks_executed: u64,

    #[serde(default)]
    pub last_executed_slot: u64,

    /// Registration timestamp in nanoseconds (Timestamp as string)
    #[serde(default)]
    pub register_start: String,
}

impl AgentInfo {
    /// Accrued reward, zero when the contract reports a malformed amount
    pub fn reward(&self) -> u128 {
        self.balance.parse().unwrap_or_default()
    }
}

/// Response of `get_agent`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetAgentResponse {
    pub agent: Option<AgentInfo>,
}

impl GetAgentResponse {
    pub fn status(&self) -> AgentStatus {
        self.agent
            .as_ref()
            .map_or(AgentStatus::Unregistered, |agent| agent.status)
    }
}

/// Response of `get_agent_ids`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentIds {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub pending: Vec<String>,
}

impl AgentIds {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }
}

/// Execute messages of the agents contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentsExecuteMsg {
    RegisterAgent {
        payable_account_id: Option<String>,
    },
    UpdateAgent {
        payable_account_id: String,
    },
    CheckInAgent {},
    UnregisterAgent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_behind: Option<bool>,
    },
    /// Admin-gated, only reachable through a factory proxy call
    AddAgentToWhitelist {
        agent_address: String,
    },
    /// Periodic housekeeping, executed by the factory-owned task
    Tick {},
}

/// Queries of the agents contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentsQueryMsg {
    GetAgent { account_id: String },
    GetAgentIds {},
}
