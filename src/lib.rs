//! Factory Deploy - multi-network deployer for factory-registered CosmWasm contracts
//!
//! Deploys a factory contract and every module registered through it
//! (manager, tasks, agents and library modules) to one or more networks,
//! records the resulting addresses, and validates the deployment with a
//! scripted agent and task lifecycle.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, message shapes, error taxonomy and ports
//! - **Service Layer** (`services`): sessions, funding, pipeline, validator, orchestration
//! - **Infrastructure Layer** (`infrastructure`): RPC transport, wallet, config, logging, artifact files
//! - **CLI Layer** (`cli`): Command-line interface

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::models::{Config, Network};
pub use domain::ports::{BuildSource, ChainQuerier, ChainSigner};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{NetworkSession, Orchestrator};
