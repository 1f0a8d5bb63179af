//! Infrastructure layer module
//!
//! Adapters satisfying the domain ports and the ambient concerns:
//! - Chain access (endpoint selection, wallet, RPC, signing client)
//! - Artifact Store
//! - Build metadata of compiled contracts
//! - Configuration management
//! - Logging infrastructure

pub mod artifacts;
pub mod build_info;
pub mod chain;
pub mod config;
pub mod logging;
