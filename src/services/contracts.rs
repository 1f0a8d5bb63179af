//! Typed clients of the manager, tasks and agents contracts.
//!
//! Thin wrappers that fix the message shapes; every call goes through the
//! session's signer or querier.

use serde::Serialize;
use tracing::debug;

use crate::domain::errors::ChainError;
use crate::domain::models::{
    AgentIds, AgentStatus, AgentWithdrawArgs, AgentsExecuteMsg, AgentsQueryMsg, Coin,
    GetAgentResponse, ManagerExecuteMsg, TaskRequest, TaskResponse, TasksExecuteMsg,
    TasksQueryMsg, TxResponse,
};
use crate::domain::ports::query_smart;
use crate::services::session::NetworkSession;

async fn execute<M: Serialize + Sync>(
    session: &NetworkSession,
    sender: &str,
    contract: &str,
    msg: &M,
    funds: &[Coin],
) -> Result<TxResponse, ChainError> {
    let msg = serde_json::to_value(msg)?;
    debug!(contract, sender, msg = %msg, "Executing contract");
    session
        .signer()
        .execute(sender, contract, &msg, funds, None)
        .await
}

/// Client of the agents contract
#[derive(Debug, Clone, Copy)]
pub struct AgentsClient<'a> {
    session: &'a NetworkSession,
    address: &'a str,
}

impl<'a> AgentsClient<'a> {
    pub const fn new(session: &'a NetworkSession, address: &'a str) -> Self {
        Self { session, address }
    }

    pub const fn address(&self) -> &str {
        self.address
    }

    pub async fn get_agent(&self, account_id: &str) -> Result<GetAgentResponse, ChainError> {
        // unknown agents come back as `null`
        let response: Option<GetAgentResponse> = query_smart(
            self.session.querier(),
            self.address,
            &AgentsQueryMsg::GetAgent {
                account_id: account_id.to_string(),
            },
        )
        .await?;
        Ok(response.unwrap_or(GetAgentResponse { agent: None }))
    }

    pub async fn status(&self, account_id: &str) -> Result<AgentStatus, ChainError> {
        Ok(self.get_agent(account_id).await?.status())
    }

    pub async fn get_agent_ids(&self) -> Result<AgentIds, ChainError> {
        query_smart(
            self.session.querier(),
            self.address,
            &AgentsQueryMsg::GetAgentIds {},
        )
        .await
    }

    /// Register `sender` as an agent paying rewards to itself
    pub async fn register(&self, sender: &str) -> Result<TxResponse, ChainError> {
        let msg = AgentsExecuteMsg::RegisterAgent {
            payable_account_id: Some(sender.to_string()),
        };
        execute(self.session, sender, self.address, &msg, &[]).await
    }

    pub async fn update(&self, sender: &str, payable_account_id: &str) -> Result<TxResponse, ChainError> {
        let msg = AgentsExecuteMsg::UpdateAgent {
            payable_account_id: payable_account_id.to_string(),
        };
        execute(self.session, sender, self.address, &msg, &[]).await
    }

    pub async fn check_in(&self, sender: &str) -> Result<TxResponse, ChainError> {
        execute(
            self.session,
            sender,
            self.address,
            &AgentsExecuteMsg::CheckInAgent {},
            &[],
        )
        .await
    }

    pub async fn unregister(&self, sender: &str) -> Result<TxResponse, ChainError> {
        let msg = AgentsExecuteMsg::UnregisterAgent { from_behind: None };
        execute(self.session, sender, self.address, &msg, &[]).await
    }
}

/// Client of the tasks contract
#[derive(Debug, Clone, Copy)]
pub struct TasksClient<'a> {
    session: &'a NetworkSession,
    address: &'a str,
}

impl<'a> TasksClient<'a> {
    pub const fn new(session: &'a NetworkSession, address: &'a str) -> Self {
        Self { session, address }
    }

    pub const fn address(&self) -> &str {
        self.address
    }

    pub async fn tasks(&self) -> Result<Vec<TaskResponse>, ChainError> {
        query_smart(
            self.session.querier(),
            self.address,
            &TasksQueryMsg::Tasks {
                from_index: None,
                limit: None,
            },
        )
        .await
    }

    /// Create a funded task; returns the transaction and the new task hash
    pub async fn create(
        &self,
        sender: &str,
        task: TaskRequest,
        funds: &[Coin],
    ) -> Result<(TxResponse, Option<String>), ChainError> {
        let msg = TasksExecuteMsg::CreateTask {
            task: Box::new(task),
        };
        let tx = execute(self.session, sender, self.address, &msg, funds).await?;
        let task_hash = created_task_hash(&tx);
        Ok((tx, task_hash))
    }

    pub async fn remove(&self, sender: &str, task_hash: &str) -> Result<TxResponse, ChainError> {
        let msg = TasksExecuteMsg::RemoveTask {
            task_hash: task_hash.to_string(),
        };
        execute(self.session, sender, self.address, &msg, &[]).await
    }
}

/// Client of the manager contract
#[derive(Debug, Clone, Copy)]
pub struct ManagerClient<'a> {
    session: &'a NetworkSession,
    address: &'a str,
}

impl<'a> ManagerClient<'a> {
    pub const fn new(session: &'a NetworkSession, address: &'a str) -> Self {
        Self { session, address }
    }

    pub const fn address(&self) -> &str {
        self.address
    }

    /// Execute the next due task as agent `sender`
    pub async fn proxy_call(&self, sender: &str, task_hash: Option<&str>) -> Result<TxResponse, ChainError> {
        let msg = ManagerExecuteMsg::ProxyCall {
            task_hash: task_hash.map(ToString::to_string),
        };
        execute(self.session, sender, self.address, &msg, &[]).await
    }

    /// Withdraw the accrued reward of agent `sender` to its payable account
    pub async fn agent_withdraw(&self, sender: &str) -> Result<TxResponse, ChainError> {
        execute(
            self.session,
            sender,
            self.address,
            &ManagerExecuteMsg::AgentWithdraw(None),
            &[],
        )
        .await
    }

    /// Withdraw on behalf of another agent to an explicit payable account
    pub async fn agent_withdraw_for(
        &self,
        sender: &str,
        args: AgentWithdrawArgs,
    ) -> Result<TxResponse, ChainError> {
        execute(
            self.session,
            sender,
            self.address,
            &ManagerExecuteMsg::AgentWithdraw(Some(args)),
            &[],
        )
        .await
    }

    pub async fn user_withdraw(&self, sender: &str, limit: Option<u64>) -> Result<TxResponse, ChainError> {
        let msg = ManagerExecuteMsg::UserWithdraw { limit };
        execute(self.session, sender, self.address, &msg, &[]).await
    }

    pub async fn refill_task_balance(
        &self,
        sender: &str,
        task_hash: &str,
        funds: &[Coin],
    ) -> Result<TxResponse, ChainError> {
        let msg = ManagerExecuteMsg::RefillTaskBalance {
            task_hash: task_hash.to_string(),
        };
        execute(self.session, sender, self.address, &msg, funds).await
    }
}

/// `task_hash` attribute emitted by the tasks contract on creation
pub fn created_task_hash(tx: &TxResponse) -> Option<String> {
    tx.events_of("wasm")
        .find_map(|event| event.attribute("task_hash"))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TxEvent;

    #[test]
    fn test_created_task_hash() {
        let tx = TxResponse {
            hash: "AA".to_string(),
            height: 3,
            gas_used: 1,
            events: vec![
                TxEvent::new("execute", &[("_contract_address", "juno1tasks")]),
                TxEvent::new(
                    "wasm",
                    &[("action", "create_task"), ("task_hash", "juno:abc123")],
                ),
            ],
        };
        assert_eq!(created_task_hash(&tx).as_deref(), Some("juno:abc123"));
    }
}
