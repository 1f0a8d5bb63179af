//! Task and manager message shapes.
//!
//! Tasks are stored, funded units of work owned by the tasks contract; the
//! manager holds their balances and pays agents for executing them. This
//! crate only builds requests and reads responses; scheduling and fee math
//! stay on chain.

use serde::{Deserialize, Serialize};

use super::chain::Coin;

/// Spacing of task execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    /// Non-recurring, executed once
    Once,
    /// Executed as soon as possible in consecutive blocks
    Immediate,
    /// Every N blocks
    Block(u64),
    /// Crontab spec string
    Cron(String),
}

/// Optional activity window of a task; bounds are Uint64 / Timestamp strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    Height {
        start: Option<String>,
        end: Option<String>,
    },
    Time {
        start: Option<String>,
        end: Option<String>,
    },
}

/// Bank sub-message of a task action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankMsg {
    Send { to_address: String, amount: Vec<Coin> },
}

/// Wasm sub-message of a task action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    Execute {
        contract_addr: String,
        /// Base64-encoded JSON execute message
        msg: String,
        funds: Vec<Coin>,
    },
}

/// Subset of `CosmosMsg` this deployer schedules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmosMsg {
    Bank(BankMsg),
    Wasm(WasmMsg),
}

/// One scheduled action with its gas allowance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub msg: CosmosMsg,
    pub gas_limit: Option<u64>,
}

impl Action {
    pub fn bank_send(to_address: impl Into<String>, amount: Vec<Coin>, gas_limit: u64) -> Self {
        Self {
            msg: CosmosMsg::Bank(BankMsg::Send {
                to_address: to_address.into(),
                amount,
            }),
            gas_limit: Some(gas_limit),
        }
    }

    /// `msg` is the already base64-encoded execute payload
    pub fn wasm_execute(contract_addr: impl Into<String>, msg: String, gas_limit: u64) -> Self {
        Self {
            msg: CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: contract_addr.into(),
                msg,
                funds: vec![],
            }),
            gas_limit: Some(gas_limit),
        }
    }
}

/// Task definition sent with `create_task`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub interval: Interval,
    pub boundary: Option<Boundary>,
    pub stop_on_fail: bool,
    pub actions: Vec<Action>,
    pub queries: Option<Vec<serde_json::Value>>,
    pub transforms: Option<Vec<serde_json::Value>>,
    pub cw20: Option<serde_json::Value>,
}

impl TaskRequest {
    /// Recurring task without queries, transforms or cw20 deposit
    pub fn recurring(interval: Interval, stop_on_fail: bool, actions: Vec<Action>) -> Self {
        Self {
            interval,
            boundary: None,
            stop_on_fail,
            actions,
            queries: None,
            transforms: None,
            cw20: None,
        }
    }
}

/// Task as listed by the `tasks` query; unknown fields are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_hash: String,
    pub owner_addr: String,
    #[serde(default)]
    pub interval: Option<Interval>,
    #[serde(default)]
    pub boundary: Option<Boundary>,
    #[serde(default)]
    pub stop_on_fail: bool,
    #[serde(default)]
    pub amount_for_one_task: Option<serde_json::Value>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Execute messages of the tasks contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TasksExecuteMsg {
    CreateTask { task: Box<TaskRequest> },
    RemoveTask { task_hash: String },
}

/// Queries of the tasks contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TasksQueryMsg {
    Tasks {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_index: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
    },
}

/// Arguments the agents contract passes when withdrawing on removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentWithdrawArgs {
    pub agent_id: String,
    pub payable_account_id: String,
}

/// Execute messages of the manager contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerExecuteMsg {
    /// Execute the current task in the queue, or the given task when it has queries
    ProxyCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_hash: Option<String>,
    },
    /// Withdraw accrued agent rewards; agents send it with `None`
    AgentWithdraw(Option<AgentWithdrawArgs>),
    UserWithdraw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
    },
    RefillTaskBalance {
        task_hash: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bank_task_shape() {
        let task = TaskRequest::recurring(
            Interval::Block(1),
            false,
            vec![Action::bank_send(
                "juno1manager",
                vec![Coin::new(2, "ujunox")],
                75_000,
            )],
        );
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({
                "interval": {"block": 1},
                "boundary": null,
                "stop_on_fail": false,
                "actions": [{
                    "msg": {"bank": {"send": {
                        "to_address": "juno1manager",
                        "amount": [{"denom": "ujunox", "amount": "2"}]
                    }}},
                    "gas_limit": 75000
                }],
                "queries": null,
                "transforms": null,
                "cw20": null
            })
        );
    }

    #[test]
    fn test_interval_variants() {
        assert_eq!(serde_json::to_value(Interval::Once).unwrap(), json!("once"));
        assert_eq!(
            serde_json::to_value(Interval::Cron("0 * * * * *".to_string())).unwrap(),
            json!({"cron": "0 * * * * *"})
        );
        let boundary = Boundary::Height {
            start: Some("100".to_string()),
            end: None,
        };
        assert_eq!(
            serde_json::to_value(boundary).unwrap(),
            json!({"height": {"start": "100", "end": null}})
        );
    }

    #[test]
    fn test_manager_message_shapes() {
        assert_eq!(
            serde_json::to_value(ManagerExecuteMsg::ProxyCall { task_hash: None }).unwrap(),
            json!({"proxy_call": {}})
        );
        assert_eq!(
            serde_json::to_value(ManagerExecuteMsg::AgentWithdraw(None)).unwrap(),
            json!({"agent_withdraw": null})
        );
        assert_eq!(
            serde_json::to_value(ManagerExecuteMsg::UserWithdraw { limit: None }).unwrap(),
            json!({"user_withdraw": {}})
        );
    }

    #[test]
    fn test_task_response_ignores_unknown_fields() {
        let tasks: Vec<TaskResponse> = serde_json::from_value(json!([{
            "task_hash": "juno:abc",
            "owner_addr": "juno1owner",
            "interval": {"block": 1},
            "boundary": null,
            "stop_on_fail": true,
            "version": "0.1",
            "queries": null
        }]))
        .unwrap();
        assert_eq!(tasks[0].owner_addr, "juno1owner");
        assert_eq!(tasks[0].interval, Some(Interval::Block(1)));
    }
}
