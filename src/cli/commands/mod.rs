//! CLI command implementations.

pub mod accounts;
pub mod cleanup;
pub mod deploy;
pub mod registry;
pub mod validate;
pub mod whitelist;
