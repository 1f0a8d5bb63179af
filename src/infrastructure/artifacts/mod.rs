//! Artifact Store: the deployer's only durable state.

pub mod store;

pub use store::ArtifactStore;
