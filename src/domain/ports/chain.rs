//! Chain ports - signing and query interfaces of one network session.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::domain::errors::ChainError;
use crate::domain::models::{Coin, InstantiateResult, TxResponse, UploadResult};

/// Read-only access to one network
///
/// Every call is side-effect free and may be retried.
#[async_trait]
pub trait ChainQuerier: Send + Sync {
    /// Balance of `address` in `denom`, zero for unknown accounts
    async fn balance(&self, address: &str, denom: &str) -> Result<u128, ChainError>;

    /// Smart query against a contract; `msg` and the result are JSON
    async fn query_smart_raw(&self, contract: &str, msg: &Value) -> Result<Value, ChainError>;
}

/// Signed transactions on one network
///
/// `sender` must be one of the session's account addresses. Calls from the
/// same sender must not overlap: the chain enforces a strictly increasing
/// account sequence.
#[async_trait]
pub trait ChainSigner: Send + Sync {
    async fn send_tokens(
        &self,
        sender: &str,
        recipient: &str,
        amount: Coin,
    ) -> Result<TxResponse, ChainError>;

    async fn upload(&self, sender: &str, wasm: Vec<u8>) -> Result<UploadResult, ChainError>;

    /// Direct instantiation, only used for contracts without a parent registry
    async fn instantiate(
        &self,
        sender: &str,
        code_id: u64,
        msg: &Value,
        label: &str,
        admin: Option<&str>,
        funds: &[Coin],
    ) -> Result<InstantiateResult, ChainError>;

    /// Contract execute; `gas_limit` overrides the signer's default execute gas
    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
        gas_limit: Option<u64>,
    ) -> Result<TxResponse, ChainError>;
}

/// Typed smart query
pub async fn query_smart<Q, R>(
    querier: &dyn ChainQuerier,
    contract: &str,
    msg: &Q,
) -> Result<R, ChainError>
where
    Q: Serialize + Sync + ?Sized,
    R: DeserializeOwned,
{
    let msg = serde_json::to_value(msg)?;
    let value = querier.query_smart_raw(contract, &msg).await?;
    Ok(serde_json::from_value(value)?)
}
