//! Cosmos SDK chain access: endpoint selection, HD wallet, RPC transport,
//! protobuf transaction encoding and the signing/query client.

pub mod client;
pub mod endpoint;
pub mod proto;
pub mod retry;
pub mod rpc;
pub mod wallet;

pub use client::CosmosClient;
pub use endpoint::EndpointSelector;
pub use retry::RetryPolicy;
pub use rpc::RpcTransport;
pub use wallet::Wallet;
