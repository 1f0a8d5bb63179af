//! Domain layer for the factory deployer
//!
//! This module contains the data model shared by every network session, the
//! error taxonomy and the ports implemented by chain adapters.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{
    AddressResolutionError, ArtifactError, BootstrapError, BuildInfoError, ChainError, DeploymentError,
    FundingError, RegistryQueryError, ValidationFailure,
};
