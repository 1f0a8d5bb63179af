//! Port trait definitions
//!
//! Interfaces the services depend on and the infrastructure implements:
//! - ChainQuerier: read-only chain queries (balances, contract smart queries)
//! - ChainSigner: signed transactions from session accounts
//! - BuildSource: compiled contracts and their provenance metadata
//!
//! Tests substitute in-memory implementations for all three.

pub mod build_source;
pub mod chain;

pub use build_source::{BuildSource, ModuleBuild};
pub use chain::{query_smart, ChainQuerier, ChainSigner};
