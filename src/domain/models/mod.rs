pub mod account;
pub mod agent;
pub mod artifact;
pub mod chain;
pub mod config;
pub mod instantiate;
pub mod network;
pub mod registry;
pub mod task;

pub use account::{AccountBook, AccountRole, AGENT_ACCOUNTS};
pub use agent::{AgentIds, AgentInfo, AgentStatus, AgentsExecuteMsg, AgentsQueryMsg, GetAgentResponse};
pub use artifact::{ArtifactRecord, ContractArtifact, FactoryRecord};
pub use chain::{Coin, EventAttribute, InstantiateResult, TxEvent, TxResponse, UploadResult};
pub use config::{
    ArtifactsConfig, Config, ContractsConfig, EndpointConfig, FundingConfig, GasConfig,
    LoggingConfig, RetryConfig, SeedPhrase, TxConfig, ValidatorConfig,
};
pub use network::{FeeToken, GasPrice, Network};
pub use registry::{
    ContractMetadata, ContractVersion, EntryResponse, FactoryExecuteMsg, FactoryQueryMsg,
    LatestContractResponse, ModuleInstantiateInfo, ModuleKind, ProxyMsg, RegistryKey,
};
pub use instantiate::{
    AgentsInstantiateMsg, FactoryInstantiateMsg, LibraryInstantiateMsg, ManagerInstantiateMsg,
    TasksInstantiateMsg,
};
pub use task::{
    Action, AgentWithdrawArgs, BankMsg, Boundary, CosmosMsg, Interval, ManagerExecuteMsg,
    TaskRequest, TaskResponse, TasksExecuteMsg, TasksQueryMsg, WasmMsg,
};
