//! Core logic of the deployer, built on the domain ports.

pub mod contracts;
pub mod funding;
pub mod orchestrator;
pub mod pipeline;
pub mod registry_client;
pub mod session;
pub mod validator;

pub use contracts::{AgentsClient, ManagerClient, TasksClient};
pub use funding::{AccountBalance, EqualizeResult, FundingEqualizer, Transfer};
pub use orchestrator::{
    AccountsView, ChainSessions, DeployReport, NetworkDeployment, NetworkRun, Orchestrator,
    RegistryView, SessionProvider,
};
pub use pipeline::{DeploymentPipeline, PipelineReport, Stage};
pub use registry_client::RegistryClient;
pub use session::NetworkSession;
pub use validator::{
    sweep_tasks, DeployedContracts, LifecycleValidator, StepOutcome, StepReport, SweepReport,
    ValidationReport,
};
