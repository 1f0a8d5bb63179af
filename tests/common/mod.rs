//! Common test utilities for integration tests
//!
//! Provides an in-memory chain that implements both chain ports, a build
//! source with synthetic wasm, and session fixtures wired to them.
#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

use factory_deploy::domain::errors::{BootstrapError, BuildInfoError, ChainError};
use factory_deploy::domain::models::{
    AccountBook, AccountRole, Coin, Config, ContractMetadata, ContractVersion, EntryResponse,
    InstantiateResult, ModuleKind, Network, TaskResponse, TxEvent, TxResponse, UploadResult,
};
use factory_deploy::domain::ports::{BuildSource, ChainQuerier, ChainSigner, ModuleBuild};
use factory_deploy::services::{NetworkSession, SessionProvider};

pub const PREFIX: &str = "juno";
pub const DENOM: &str = "ujunox";
pub const PAUSE_ADMIN: &str = "juno1pauseadmin";

/// Outstanding tasks one active agent covers before a pending agent is nominated
pub const TASKS_PER_AGENT: usize = 3;
/// Reward credited to an agent per proxy call
pub const REWARD_PER_CALL: u128 = 10;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Address of a named account in the fake chain
pub fn address_of(role: AccountRole) -> String {
    format!("{PREFIX}1{}", role.to_string().replace('_', ""))
}

/// Every role except the pause admin, which is a configured multisig
pub fn accounts() -> AccountBook {
    AccountBook::new(
        AccountRole::all()
            .into_iter()
            .filter(|role| *role != AccountRole::PauseAdmin)
            .map(|role| (role, address_of(role))),
    )
}

pub fn network() -> Network {
    Config::default()
        .network("junotestnet")
        .expect("junotestnet is a default network")
}

/// Session of `network` whose signer and querier are `chain`
pub fn session_for(network: Network, chain: &Arc<FakeChain>) -> NetworkSession {
    NetworkSession::new(
        network,
        "http://fake-rpc",
        accounts(),
        PAUSE_ADMIN,
        chain.clone(),
        chain.clone(),
    )
}

pub fn session(chain: &Arc<FakeChain>) -> NetworkSession {
    session_for(network(), chain)
}

/// Configuration with fast polling for scenario tests
pub fn test_config(artifacts: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.artifacts.dir = artifacts.to_path_buf();
    config.supported_networks = Some("junotestnet".to_string());
    config.validator.nomination_timeout_ms = 300;
    config.validator.nomination_initial_backoff_ms = 10;
    config.validator.nomination_max_backoff_ms = 50;
    config
}

/// Sessions over fake chains keyed by chain name; other networks fail to bootstrap
#[derive(Default)]
pub struct FakeSessions {
    chains: HashMap<String, Arc<FakeChain>>,
}

impl FakeSessions {
    pub fn with(mut self, chain_name: &str, chain: &Arc<FakeChain>) -> Self {
        self.chains.insert(chain_name.to_string(), chain.clone());
        self
    }
}

#[async_trait]
impl SessionProvider for FakeSessions {
    async fn open(&self, network: &Network) -> Result<NetworkSession, BootstrapError> {
        match self.chains.get(&network.chain_name) {
            Some(chain) => Ok(session_for(network.clone(), chain)),
            None => Err(BootstrapError::NoLiveEndpoint {
                network: network.chain_name.clone(),
                attempts: network
                    .rpc
                    .iter()
                    .map(|url| format!("{url}: connection refused"))
                    .collect(),
            }),
        }
    }
}

/// Build source serving `wasm:<name>` for every contract except the missing ones
#[derive(Debug, Default)]
pub struct FakeBuild {
    missing: HashSet<String>,
}

impl FakeBuild {
    pub fn without(mut self, contract_name: &str) -> Self {
        self.missing.insert(contract_name.to_string());
        self
    }
}

#[async_trait]
impl BuildSource for FakeBuild {
    async fn module(&self, contract_name: &str) -> Result<ModuleBuild, BuildInfoError> {
        if self.missing.contains(contract_name) {
            return Err(BuildInfoError::WasmNotFound(
                format!("artifacts/croncat_{contract_name}.wasm").into(),
            ));
        }
        let wasm = format!("wasm:{contract_name}").into_bytes();
        Ok(ModuleBuild {
            contract_name: contract_name.to_string(),
            checksum: hex::encode(Sha256::digest(&wasm)),
            wasm,
            version: self.version(contract_name)?,
            commit_id: "0123abcd".to_string(),
            changelog_url: "https://github.com/croncats".to_string(),
        })
    }

    fn version(&self, _contract_name: &str) -> Result<ContractVersion, BuildInfoError> {
        Ok(ContractVersion::new(0, 1))
    }
}

/// Injected misbehavior of the factory when deploying one contract
#[derive(Debug, Clone)]
pub enum Fault {
    /// Reject the deploy transaction with this raw log
    Reject(String),
    /// Instantiate the contract but emit no `instantiate` event
    NoInstantiateEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Factory,
    Manager,
    Tasks,
    Agents,
    Library,
}

#[derive(Debug, Clone)]
struct Contract {
    kind: Kind,
    /// Deployer for the factory, the factory for every registered module
    creator: String,
    allowed_agents: Vec<String>,
}

#[derive(Debug, Clone)]
struct Agent {
    address: String,
    payable: String,
    reward: u128,
    active: bool,
    executed: u64,
}

#[derive(Debug, Clone, Default)]
struct State {
    next_code_id: u64,
    next_contract: u64,
    height: u64,
    balances: HashMap<String, u128>,
    codes: HashMap<u64, Vec<u8>>,
    contracts: HashMap<String, Contract>,
    /// Registry entries per factory, in registration order
    registry: HashMap<String, Vec<EntryResponse>>,
    /// Agents per agents contract, in registration order
    agents: HashMap<String, Vec<Agent>>,
    /// Tasks per tasks contract with their deposit
    tasks: HashMap<String, Vec<(TaskResponse, u128)>>,
    faults: HashMap<String, Fault>,
    /// Raw log returned for `(sender, execute message name)`
    rejections: HashMap<(String, String), String>,
    transfers: Vec<(String, String, u128)>,
    executes: Vec<(String, String, Value)>,
}

fn rejected(log: impl Into<String>) -> ChainError {
    ChainError::TxRejected {
        code: 5,
        codespace: "wasm".to_string(),
        log: log.into(),
    }
}

fn coins_total(funds: &[Coin]) -> u128 {
    funds.iter().map(Coin::amount_u128).sum()
}

fn decode_b64_json(value: &Value) -> Result<Value, ChainError> {
    let encoded = value
        .as_str()
        .ok_or_else(|| rejected("msg is not a base64 string"))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| rejected(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| rejected(format!("invalid json: {e}")))
}

fn field<'a>(msg: &'a Value, name: &str) -> Option<&'a Value> {
    msg.as_object().and_then(|o| o.get(name))
}

impl State {
    fn new_address(&mut self) -> String {
        self.next_contract += 1;
        format!("{PREFIX}1contract{}", self.next_contract)
    }

    fn move_funds(&mut self, from: &str, to: &str, amount: u128) -> Result<(), ChainError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.get(from).copied().unwrap_or_default();
        if balance < amount {
            return Err(ChainError::TxRejected {
                code: 5,
                codespace: "sdk".to_string(),
                log: format!("{balance}{DENOM} is smaller than {amount}{DENOM}: insufficient funds"),
            });
        }
        self.balances.insert(from.to_string(), balance - amount);
        *self.balances.entry(to.to_string()).or_default() += amount;
        Ok(())
    }

    fn contract(&self, address: &str) -> Result<Contract, ChainError> {
        self.contracts
            .get(address)
            .cloned()
            .ok_or_else(|| rejected(format!("contract {address} not found")))
    }

    /// Sibling module of `kind` registered by the same factory
    fn sibling(&self, creator: &str, kind: Kind) -> Option<String> {
        let mut siblings: Vec<&String> = self
            .contracts
            .iter()
            .filter(|(_, c)| c.creator == creator && c.kind == kind)
            .map(|(address, _)| address)
            .collect();
        siblings.sort_by_key(|a| a.trim_start_matches(&format!("{PREFIX}1contract")).parse::<u64>().unwrap_or(0));
        siblings.last().map(|a| (*a).clone())
    }

    fn task_count(&self, creator: &str) -> usize {
        self.sibling(creator, Kind::Tasks)
            .and_then(|tasks| self.tasks.get(&tasks))
            .map_or(0, Vec::len)
    }

    fn agent_status(&self, agents_contract: &str, agent: &str) -> Option<&'static str> {
        let creator = self.contracts.get(agents_contract)?.creator.clone();
        let agents = self.agents.get(agents_contract)?;
        let record = agents.iter().find(|a| a.address == agent)?;
        if record.active {
            return Some("active");
        }
        let active = agents.iter().filter(|a| a.active).count();
        let position = agents
            .iter()
            .filter(|a| !a.active)
            .position(|a| a.address == agent)?;
        let tasks = self.task_count(&creator);
        let capacity = active * TASKS_PER_AGENT;
        let slots = if tasks > capacity {
            (tasks - capacity).div_ceil(TASKS_PER_AGENT)
        } else {
            0
        };
        Some(if position < slots { "nominated" } else { "pending" })
    }

    fn execute(
        &mut self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
    ) -> Result<Vec<TxEvent>, ChainError> {
        let target = self.contract(contract)?;
        self.move_funds(sender, contract, coins_total(funds))?;
        self.executes
            .push((sender.to_string(), contract.to_string(), msg.clone()));

        let mut events = vec![TxEvent::new("execute", &[("_contract_address", contract)])];
        let (action, body) = msg
            .as_object()
            .and_then(|o| o.iter().next())
            .ok_or_else(|| rejected("empty execute message"))?;

        match (target.kind, action.as_str()) {
            (Kind::Factory, "deploy") => {
                if sender != target.creator {
                    return Err(rejected("Unauthorized"));
                }
                events.extend(self.deploy(contract, body, coins_total(funds))?);
            }
            (Kind::Factory, "proxy") => {
                if sender != target.creator {
                    return Err(rejected("Unauthorized"));
                }
                let inner = field(body, "msg")
                    .and_then(|m| field(m, "execute"))
                    .ok_or_else(|| rejected("unknown proxy message"))?;
                let inner_contract = field(inner, "contract_addr")
                    .and_then(Value::as_str)
                    .ok_or_else(|| rejected("missing contract_addr"))?
                    .to_string();
                let inner_msg = decode_b64_json(field(inner, "msg").unwrap_or(&Value::Null))?;
                let inner_funds: Vec<Coin> = serde_json::from_value(
                    field(inner, "funds").cloned().unwrap_or_else(|| json!([])),
                )?;
                events.extend(self.execute(contract, &inner_contract, &inner_msg, &inner_funds)?);
            }
            (Kind::Agents, "register_agent") => {
                let agents = self.agents.entry(contract.to_string()).or_default();
                if agents.iter().any(|a| a.address == sender) {
                    return Err(rejected("Agent already registered"));
                }
                if !target.allowed_agents.iter().any(|a| a == sender) {
                    return Err(rejected("Unauthorized: agent is not whitelisted"));
                }
                let payable = field(body, "payable_account_id")
                    .and_then(Value::as_str)
                    .unwrap_or(sender)
                    .to_string();
                let active = !agents.iter().any(|a| a.active);
                agents.push(Agent {
                    address: sender.to_string(),
                    payable,
                    reward: 0,
                    active,
                    executed: 0,
                });
            }
            (Kind::Agents, "update_agent") => {
                let payable = field(body, "payable_account_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| rejected("missing payable_account_id"))?
                    .to_string();
                let agent = self
                    .agents
                    .entry(contract.to_string())
                    .or_default()
                    .iter_mut()
                    .find(|a| a.address == sender)
                    .ok_or_else(|| rejected("Agent not registered"))?;
                agent.payable = payable;
            }
            (Kind::Agents, "check_in_agent") => {
                if self.agent_status(contract, sender) != Some("nominated") {
                    return Err(rejected("Agent is not nominated"));
                }
                if let Some(agent) = self
                    .agents
                    .get_mut(contract)
                    .and_then(|agents| agents.iter_mut().find(|a| a.address == sender))
                {
                    agent.active = true;
                }
            }
            (Kind::Agents, "unregister_agent") => {
                let agents = self.agents.entry(contract.to_string()).or_default();
                let index = agents
                    .iter()
                    .position(|a| a.address == sender)
                    .ok_or_else(|| rejected("Agent not registered"))?;
                let agent = agents.remove(index);
                if agent.reward > 0 {
                    *self.balances.entry(agent.payable).or_default() += agent.reward;
                }
            }
            (Kind::Agents, "add_agent_to_whitelist") => {
                if sender != target.creator {
                    return Err(rejected("Unauthorized: only the factory can whitelist"));
                }
                let agent = field(body, "agent_address")
                    .and_then(Value::as_str)
                    .ok_or_else(|| rejected("missing agent_address"))?
                    .to_string();
                if let Some(c) = self.contracts.get_mut(contract) {
                    c.allowed_agents.push(agent);
                }
            }
            (Kind::Agents, "tick") => {}
            (Kind::Tasks, "create_task") => {
                let deposit = coins_total(funds);
                if deposit == 0 {
                    return Err(rejected("Must attach funds"));
                }
                let task = field(body, "task").ok_or_else(|| rejected("missing task"))?;
                let digest = Sha256::digest(
                    serde_json::to_vec(&json!({"owner": sender, "task": task}))?,
                );
                let task_hash = format!("{PREFIX}:{}", hex::encode(digest));
                let tasks = self.tasks.entry(contract.to_string()).or_default();
                if tasks.iter().any(|(t, _)| t.task_hash == task_hash) {
                    return Err(rejected("Task already exists"));
                }
                tasks.push((
                    TaskResponse {
                        task_hash: task_hash.clone(),
                        owner_addr: sender.to_string(),
                        interval: serde_json::from_value(task["interval"].clone()).ok(),
                        boundary: None,
                        stop_on_fail: task["stop_on_fail"].as_bool().unwrap_or_default(),
                        amount_for_one_task: None,
                        actions: serde_json::from_value(task["actions"].clone())
                            .unwrap_or_default(),
                    },
                    deposit,
                ));
                events.push(TxEvent::new(
                    "wasm",
                    &[
                        ("_contract_address", contract),
                        ("action", "create_task"),
                        ("task_hash", &task_hash),
                    ],
                ));
            }
            (Kind::Tasks, "remove_task") => {
                let task_hash = field(body, "task_hash")
                    .and_then(Value::as_str)
                    .ok_or_else(|| rejected("missing task_hash"))?;
                let tasks = self.tasks.entry(contract.to_string()).or_default();
                let index = tasks
                    .iter()
                    .position(|(t, _)| t.task_hash == task_hash)
                    .ok_or_else(|| rejected("Task not found"))?;
                if tasks[index].0.owner_addr != sender {
                    return Err(rejected("Unauthorized: only the owner can remove a task"));
                }
                let (task, deposit) = tasks.remove(index);
                self.move_funds(contract, &task.owner_addr, deposit)?;
            }
            (Kind::Manager, "proxy_call") => {
                let agents = self
                    .sibling(&target.creator, Kind::Agents)
                    .ok_or_else(|| rejected("No agents contract"))?;
                if self.agent_status(&agents, sender) != Some("active") {
                    return Err(rejected("Agent is not active"));
                }
                if self.task_count(&target.creator) == 0 {
                    return Err(rejected("No tasks for execution"));
                }
                if let Some(agent) = self
                    .agents
                    .get_mut(&agents)
                    .and_then(|agents| agents.iter_mut().find(|a| a.address == sender))
                {
                    agent.reward += REWARD_PER_CALL;
                    agent.executed += 1;
                }
            }
            (Kind::Manager, "agent_withdraw") => {
                let agents = self
                    .sibling(&target.creator, Kind::Agents)
                    .ok_or_else(|| rejected("No agents contract"))?;
                let agent = self
                    .agents
                    .get_mut(&agents)
                    .and_then(|agents| agents.iter_mut().find(|a| a.address == sender))
                    .ok_or_else(|| rejected("Agent not registered"))?;
                let (payable, reward) = (agent.payable.clone(), agent.reward);
                agent.reward = 0;
                *self.balances.entry(payable).or_default() += reward;
            }
            (Kind::Manager, "user_withdraw" | "refill_task_balance") => {}
            (kind, action) => {
                return Err(rejected(format!("unknown variant `{action}` for {kind:?}")));
            }
        }
        Ok(events)
    }

    fn deploy(
        &mut self,
        factory: &str,
        body: &Value,
        deposit: u128,
    ) -> Result<Vec<TxEvent>, ChainError> {
        let kind: ModuleKind = serde_json::from_value(
            field(body, "kind").cloned().unwrap_or(Value::Null),
        )?;
        let info = field(body, "module_instantiate_info")
            .ok_or_else(|| rejected("missing module_instantiate_info"))?;
        let code_id = info["code_id"]
            .as_u64()
            .ok_or_else(|| rejected("missing code_id"))?;
        let contract_name = info["contract_name"]
            .as_str()
            .ok_or_else(|| rejected("missing contract_name"))?
            .to_string();
        if !self.codes.contains_key(&code_id) {
            return Err(rejected(format!("code {code_id} not found")));
        }
        let init = decode_b64_json(&info["msg"])?;

        let fault = self.faults.get(&contract_name).cloned();
        if let Some(Fault::Reject(log)) = &fault {
            return Err(rejected(log.clone()));
        }

        let address = self.new_address();
        let allowed_agents = init["allowed_agents"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
            .unwrap_or_default();
        let kind_of = match kind {
            ModuleKind::Manager => Kind::Manager,
            ModuleKind::Tasks => Kind::Tasks,
            ModuleKind::Agents => Kind::Agents,
            ModuleKind::Library => Kind::Library,
        };
        self.contracts.insert(
            address.clone(),
            Contract {
                kind: kind_of,
                creator: factory.to_string(),
                allowed_agents,
            },
        );
        // the factory forwards the attached funds to the new contract
        self.move_funds(factory, &address, deposit)?;

        let metadata = ContractMetadata {
            kind: Some(kind),
            code_id,
            contract_addr: address.clone(),
            version: serde_json::from_value(info["version"].clone())?,
            commit_id: info["commit_id"].as_str().unwrap_or_default().to_string(),
            checksum: info["checksum"].as_str().unwrap_or_default().to_string(),
            changelog_url: info["changelog_url"].as_str().map(ToString::to_string),
            schema: info["schema"].as_str().map(ToString::to_string),
        };
        self.registry
            .entry(factory.to_string())
            .or_default()
            .push(EntryResponse {
                contract_name,
                metadata,
            });

        let mut events = vec![TxEvent::new(
            "wasm",
            &[("_contract_address", factory), ("action", "deploy")],
        )];
        if !matches!(fault, Some(Fault::NoInstantiateEvent)) {
            events.push(TxEvent::new(
                "instantiate",
                &[
                    ("_contract_address", &address),
                    ("code_id", &code_id.to_string()),
                ],
            ));
        }
        Ok(events)
    }

    fn query(&self, contract: &str, msg: &Value) -> Result<Value, ChainError> {
        let target = self
            .contracts
            .get(contract)
            .ok_or_else(|| ChainError::QueryFailed {
                code: 18,
                log: format!("contract {contract} not found"),
            })?;
        let (query, body) = msg
            .as_object()
            .and_then(|o| o.iter().next())
            .ok_or_else(|| ChainError::Malformed("empty query".to_string()))?;
        let entries = self.registry.get(contract).cloned().unwrap_or_default();

        let value = match (target.kind, query.as_str()) {
            (Kind::Factory, "latest_contracts") => {
                let mut latest: Vec<EntryResponse> = Vec::new();
                for entry in entries {
                    match latest
                        .iter_mut()
                        .find(|e| e.contract_name == entry.contract_name)
                    {
                        Some(existing) => *existing = entry,
                        None => latest.push(entry),
                    }
                }
                serde_json::to_value(latest)?
            }
            (Kind::Factory, "latest_contract") => {
                let name = body["contract_name"].as_str().unwrap_or_default();
                let metadata = entries
                    .iter()
                    .rev()
                    .find(|e| e.contract_name == name)
                    .map(|e| e.metadata.clone());
                json!({ "metadata": metadata })
            }
            (Kind::Factory, "versions_by_contract_name") => {
                let name = body["contract_name"].as_str().unwrap_or_default();
                let versions: Vec<ContractMetadata> = entries
                    .iter()
                    .filter(|e| e.contract_name == name)
                    .map(|e| e.metadata.clone())
                    .collect();
                serde_json::to_value(versions)?
            }
            (Kind::Factory, "contract_names") => {
                let mut names: Vec<String> = Vec::new();
                for entry in &entries {
                    if !names.contains(&entry.contract_name) {
                        names.push(entry.contract_name.clone());
                    }
                }
                serde_json::to_value(names)?
            }
            (Kind::Factory, "all_entries") => serde_json::to_value(entries)?,
            (Kind::Agents, "get_agent") => {
                let account = body["account_id"].as_str().unwrap_or_default();
                let agent = self
                    .agents
                    .get(contract)
                    .and_then(|agents| agents.iter().find(|a| a.address == account));
                match (agent, self.agent_status(contract, account)) {
                    (Some(agent), Some(status)) => json!({
                        "agent": {
                            "status": status,
                            "payable_account_id": agent.payable,
                            "balance": agent.reward.to_string(),
                            "total_tasks_executed": agent.executed,
                            "last_executed_slot": 0,
                            "register_start": "0"
                        }
                    }),
                    _ => json!({ "agent": null }),
                }
            }
            (Kind::Agents, "get_agent_ids") => {
                let agents = self.agents.get(contract).cloned().unwrap_or_default();
                let (active, pending): (Vec<Agent>, Vec<Agent>) =
                    agents.into_iter().partition(|a| a.active);
                json!({
                    "active": active.into_iter().map(|a| a.address).collect::<Vec<_>>(),
                    "pending": pending.into_iter().map(|a| a.address).collect::<Vec<_>>(),
                })
            }
            (Kind::Tasks, "tasks") => {
                let tasks: Vec<TaskResponse> = self
                    .tasks
                    .get(contract)
                    .map(|tasks| tasks.iter().map(|(t, _)| t.clone()).collect())
                    .unwrap_or_default();
                serde_json::to_value(tasks)?
            }
            (kind, query) => {
                return Err(ChainError::QueryFailed {
                    code: 9,
                    log: format!("unknown variant `{query}` for {kind:?}"),
                })
            }
        };
        Ok(value)
    }
}

/// In-memory chain: code store, bank balances and the contracts this
/// deployer talks to
#[derive(Debug, Default)]
pub struct FakeChain {
    state: Mutex<State>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Chain where the deployer holds `amount`
    pub fn funded(amount: u128) -> Arc<Self> {
        let chain = Self::new();
        chain.set_balance(&address_of(AccountRole::Deployer), amount);
        chain
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake chain state poisoned")
    }

    pub fn set_balance(&self, address: &str, amount: u128) {
        self.lock().balances.insert(address.to_string(), amount);
    }

    pub fn balance_of(&self, address: &str) -> u128 {
        self.lock().balances.get(address).copied().unwrap_or_default()
    }

    pub fn inject(&self, contract_name: &str, fault: Fault) {
        self.lock().faults.insert(contract_name.to_string(), fault);
    }

    /// Reject every `action` execute sent by `sender` with `log`
    pub fn reject_execute(&self, sender: &str, action: &str, log: &str) {
        self.lock()
            .rejections
            .insert((sender.to_string(), action.to_string()), log.to_string());
    }

    /// `(from, to, amount)` of every bank send
    pub fn transfers(&self) -> Vec<(String, String, u128)> {
        self.lock().transfers.clone()
    }

    /// `(sender, contract, msg)` of every execute, proxied ones included
    pub fn executes(&self) -> Vec<(String, String, Value)> {
        self.lock().executes.clone()
    }

    pub fn task_owners(&self, tasks_contract: &str) -> Vec<String> {
        self.lock()
            .tasks
            .get(tasks_contract)
            .map(|tasks| tasks.iter().map(|(t, _)| t.owner_addr.clone()).collect())
            .unwrap_or_default()
    }

    fn respond(&self, state: &mut State, events: Vec<TxEvent>) -> TxResponse {
        state.height += 1;
        TxResponse {
            hash: format!("{:064X}", state.height),
            height: state.height,
            gas_used: 100_000,
            events,
        }
    }
}

#[async_trait]
impl ChainQuerier for FakeChain {
    async fn balance(&self, address: &str, denom: &str) -> Result<u128, ChainError> {
        if denom != DENOM {
            return Ok(0);
        }
        Ok(self.balance_of(address))
    }

    async fn query_smart_raw(&self, contract: &str, msg: &Value) -> Result<Value, ChainError> {
        self.lock().query(contract, msg)
    }
}

#[async_trait]
impl ChainSigner for FakeChain {
    async fn send_tokens(
        &self,
        sender: &str,
        recipient: &str,
        amount: Coin,
    ) -> Result<TxResponse, ChainError> {
        let mut state = self.lock();
        let value = amount.amount_u128();
        state.move_funds(sender, recipient, value)?;
        state
            .transfers
            .push((sender.to_string(), recipient.to_string(), value));
        let events = vec![TxEvent::new(
            "transfer",
            &[
                ("recipient", recipient),
                ("sender", sender),
                ("amount", &format!("{value}{}", amount.denom)),
            ],
        )];
        Ok(self.respond(&mut state, events))
    }

    async fn upload(&self, _sender: &str, wasm: Vec<u8>) -> Result<UploadResult, ChainError> {
        let mut state = self.lock();
        state.next_code_id += 1;
        let code_id = state.next_code_id;
        state.codes.insert(code_id, wasm);
        let events = vec![TxEvent::new("store_code", &[("code_id", &code_id.to_string())])];
        let tx = self.respond(&mut state, events);
        Ok(UploadResult { code_id, tx })
    }

    async fn instantiate(
        &self,
        sender: &str,
        code_id: u64,
        _msg: &Value,
        _label: &str,
        admin: Option<&str>,
        funds: &[Coin],
    ) -> Result<InstantiateResult, ChainError> {
        let mut state = self.lock();
        if !state.codes.contains_key(&code_id) {
            return Err(rejected(format!("code {code_id} not found")));
        }
        let address = state.new_address();
        state.move_funds(sender, &address, coins_total(funds))?;
        state.contracts.insert(
            address.clone(),
            Contract {
                kind: Kind::Factory,
                creator: admin.unwrap_or(sender).to_string(),
                allowed_agents: Vec::new(),
            },
        );
        let events = vec![TxEvent::new(
            "instantiate",
            &[("_contract_address", &address), ("code_id", &code_id.to_string())],
        )];
        let tx = self.respond(&mut state, events);
        Ok(InstantiateResult { address, tx })
    }

    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
        _gas_limit: Option<u64>,
    ) -> Result<TxResponse, ChainError> {
        let mut state = self.lock();
        let action = msg
            .as_object()
            .and_then(|o| o.keys().next())
            .cloned()
            .unwrap_or_default();
        if let Some(log) = state.rejections.get(&(sender.to_string(), action)) {
            return Err(rejected(log.clone()));
        }
        let snapshot = state.clone();
        match state.execute(sender, contract, msg, funds) {
            Ok(events) => Ok(self.respond(&mut state, events)),
            Err(e) => {
                *state = snapshot;
                Err(e)
            }
        }
    }
}
