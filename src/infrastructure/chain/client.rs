//! Signing and query client of one network, bound to a selected endpoint.

use async_trait::async_trait;
use prost::Message;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use super::proto::{self, Any};
use super::retry::RetryPolicy;
use super::rpc::RpcTransport;
use super::wallet::Wallet;
use crate::domain::errors::{BootstrapError, ChainError};
use crate::domain::models::{
    Coin, Config, GasConfig, GasPrice, InstantiateResult, Network, TxConfig, TxResponse,
    UploadResult,
};
use crate::domain::ports::{ChainQuerier, ChainSigner};

/// On-chain account number and sequence of a signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AccountState {
    account_number: u64,
    sequence: u64,
}

/// Cosmos SDK client signing with the session wallet (SIGN_MODE_DIRECT)
pub struct CosmosClient {
    rpc: RpcTransport,
    wallet: Arc<Wallet>,
    chain_id: String,
    gas_price: GasPrice,
    gas: GasConfig,
    tx: TxConfig,
    retry: RetryPolicy,
    /// Held from account lookup until inclusion, so sequences never collide
    broadcast_lock: Mutex<()>,
}

impl std::fmt::Debug for CosmosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosClient")
            .field("endpoint", &self.rpc.endpoint())
            .field("chain_id", &self.chain_id)
            .field("gas_price", &self.gas_price)
            .finish_non_exhaustive()
    }
}

impl CosmosClient {
    /// Connect to `endpoint` and check that it serves the network's chain id
    pub async fn connect(
        endpoint: &str,
        network: &Network,
        wallet: Arc<Wallet>,
        config: &Config,
    ) -> Result<Self, BootstrapError> {
        let connect_failed = |reason: String| BootstrapError::ClientConnectFailed {
            endpoint: endpoint.to_string(),
            reason,
        };

        let rpc = RpcTransport::new(endpoint, Duration::from_millis(config.tx.request_timeout_ms))
            .map_err(|e| connect_failed(e.to_string()))?;
        let status = rpc.status().await.map_err(|e| connect_failed(e.to_string()))?;

        if status.node_info.network != network.chain_id {
            return Err(connect_failed(format!(
                "node serves chain '{}', expected '{}'",
                status.node_info.network, network.chain_id
            )));
        }

        info!(
            network = %network.chain_name,
            endpoint,
            chain_id = %network.chain_id,
            "Connected signing client"
        );

        Ok(Self {
            rpc,
            wallet,
            chain_id: network.chain_id.clone(),
            gas_price: network.gas_price(),
            gas: config.gas.clone(),
            tx: config.tx.clone(),
            retry: RetryPolicy::from(&config.retry),
            broadcast_lock: Mutex::new(()),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint()
    }

    async fn abci<Req: Message, Resp: Message + Default>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp, ChainError> {
        let data = request.encode_to_vec();
        let bytes = self
            .retry
            .execute(|| self.rpc.abci_query(path, &data))
            .await?;
        Resp::decode(bytes.as_slice()).map_err(|e| ChainError::Malformed(format!("{path}: {e}")))
    }

    async fn account(&self, address: &str) -> Result<AccountState, ChainError> {
        let request = proto::QueryAccountRequest {
            address: address.to_string(),
        };
        let response: proto::QueryAccountResponse = match self.abci(proto::QUERY_ACCOUNT, &request).await {
            Ok(response) => response,
            Err(ChainError::QueryFailed { log, .. }) if log.contains("not found") => {
                return Err(ChainError::AccountNotFound(address.to_string()));
            }
            Err(err) => return Err(err),
        };

        let any = response
            .account
            .ok_or_else(|| ChainError::AccountNotFound(address.to_string()))?;
        if any.type_url != proto::BASE_ACCOUNT {
            return Err(ChainError::Malformed(format!(
                "unsupported account type {} for {address}",
                any.type_url
            )));
        }
        let account = proto::BaseAccount::decode(any.value.as_slice())
            .map_err(|e| ChainError::Malformed(format!("account {address}: {e}")))?;

        Ok(AccountState {
            account_number: account.account_number,
            sequence: account.sequence,
        })
    }

    /// Sign `messages` as `sender`, broadcast, and wait for inclusion
    #[instrument(skip(self, messages), fields(chain_id = %self.chain_id))]
    async fn sign_and_broadcast(
        &self,
        sender: &str,
        messages: Vec<Any>,
        gas_limit: u64,
    ) -> Result<TxResponse, ChainError> {
        let _guard = self.broadcast_lock.lock().await;

        let account = self.account(sender).await?;
        let public_key = self.wallet.public_key(sender)?;

        let body = proto::TxBody {
            messages,
            memo: self.tx.memo.clone(),
            timeout_height: 0,
        };
        let fee = self.gas_price.fee_for(gas_limit);
        let auth_info = proto::AuthInfo {
            signer_infos: vec![proto::SignerInfo {
                public_key: Some(Any::pack(
                    proto::SECP256K1_PUBKEY,
                    &proto::PubKey {
                        key: public_key.to_vec(),
                    },
                )),
                mode_info: Some(proto::ModeInfo {
                    single: Some(proto::ModeInfoSingle {
                        mode: proto::SIGN_MODE_DIRECT,
                    }),
                }),
                sequence: account.sequence,
            }],
            fee: Some(proto::Fee {
                amount: vec![proto::Coin::from(&fee)],
                gas_limit,
                payer: String::new(),
                granter: String::new(),
            }),
        };

        let body_bytes = body.encode_to_vec();
        let auth_info_bytes = auth_info.encode_to_vec();
        let sign_doc = proto::SignDoc {
            body_bytes: body_bytes.clone(),
            auth_info_bytes: auth_info_bytes.clone(),
            chain_id: self.chain_id.clone(),
            account_number: account.account_number,
        };
        let signature = self.wallet.sign(sender, &sign_doc.encode_to_vec())?;

        let raw = proto::TxRaw {
            body_bytes,
            auth_info_bytes,
            signatures: vec![signature.to_vec()],
        };

        let broadcast = self.rpc.broadcast_tx_sync(&raw.encode_to_vec()).await?;
        debug!(
            hash = %broadcast.hash,
            sequence = account.sequence,
            gas_limit,
            fee = %fee.amount,
            "Transaction accepted into mempool"
        );

        self.wait_for_tx(&broadcast.hash).await
    }

    /// Poll `tx` until the transaction is indexed or the confirmation timeout expires
    async fn wait_for_tx(&self, hash: &str) -> Result<TxResponse, ChainError> {
        let started = Instant::now();
        let timeout = Duration::from_millis(self.tx.confirm_timeout_ms);
        let interval = Duration::from_millis(self.tx.poll_interval_ms.max(1));

        loop {
            match self.rpc.tx(hash).await {
                Ok(response) => {
                    debug!(hash, height = response.height, gas_used = response.gas_used, "Transaction included");
                    return Ok(response);
                }
                Err(err) if err.is_transient() => {
                    if started.elapsed() >= timeout {
                        return Err(ChainError::TxTimeout {
                            hash: hash.to_string(),
                            waited_ms: u64::try_from(started.elapsed().as_millis())
                                .unwrap_or(u64::MAX),
                        });
                    }
                    sleep(interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl ChainQuerier for CosmosClient {
    async fn balance(&self, address: &str, denom: &str) -> Result<u128, ChainError> {
        let request = proto::QueryBalanceRequest {
            address: address.to_string(),
            denom: denom.to_string(),
        };
        let response: proto::QueryBalanceResponse =
            self.abci(proto::QUERY_BALANCE, &request).await?;

        match response.balance {
            Some(coin) if !coin.amount.is_empty() => coin
                .amount
                .parse()
                .map_err(|e| ChainError::Malformed(format!("balance amount '{}': {e}", coin.amount))),
            _ => Ok(0),
        }
    }

    async fn query_smart_raw(&self, contract: &str, msg: &Value) -> Result<Value, ChainError> {
        let request = proto::QuerySmartContractStateRequest {
            address: contract.to_string(),
            query_data: serde_json::to_vec(msg)?,
        };
        let response: proto::QuerySmartContractStateResponse =
            self.abci(proto::QUERY_SMART, &request).await?;
        Ok(serde_json::from_slice(&response.data)?)
    }
}

#[async_trait]
impl ChainSigner for CosmosClient {
    async fn send_tokens(
        &self,
        sender: &str,
        recipient: &str,
        amount: Coin,
    ) -> Result<TxResponse, ChainError> {
        let msg = proto::MsgSend {
            from_address: sender.to_string(),
            to_address: recipient.to_string(),
            amount: vec![proto::Coin::from(&amount)],
        };
        self.sign_and_broadcast(sender, vec![Any::pack(proto::MSG_SEND, &msg)], self.gas.send)
            .await
    }

    async fn upload(&self, sender: &str, wasm: Vec<u8>) -> Result<UploadResult, ChainError> {
        let msg = proto::MsgStoreCode {
            sender: sender.to_string(),
            wasm_byte_code: wasm,
        };
        let tx = self
            .sign_and_broadcast(sender, vec![Any::pack(proto::MSG_STORE_CODE, &msg)], self.gas.upload)
            .await?;
        let code_id = tx
            .code_id()
            .ok_or_else(|| ChainError::Malformed(format!("tx {} has no store_code event", tx.hash)))?;
        Ok(UploadResult { code_id, tx })
    }

    async fn instantiate(
        &self,
        sender: &str,
        code_id: u64,
        msg: &Value,
        label: &str,
        admin: Option<&str>,
        funds: &[Coin],
    ) -> Result<InstantiateResult, ChainError> {
        let msg = proto::MsgInstantiateContract {
            sender: sender.to_string(),
            admin: admin.unwrap_or_default().to_string(),
            code_id,
            label: label.to_string(),
            msg: serde_json::to_vec(msg)?,
            funds: funds.iter().map(proto::Coin::from).collect(),
        };
        let tx = self
            .sign_and_broadcast(
                sender,
                vec![Any::pack(proto::MSG_INSTANTIATE_CONTRACT, &msg)],
                self.gas.instantiate,
            )
            .await?;
        let address = tx.instantiated_address(Some(code_id))?;
        Ok(InstantiateResult { address, tx })
    }

    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
        gas_limit: Option<u64>,
    ) -> Result<TxResponse, ChainError> {
        let msg = proto::MsgExecuteContract {
            sender: sender.to_string(),
            contract: contract.to_string(),
            msg: serde_json::to_vec(msg)?,
            funds: funds.iter().map(proto::Coin::from).collect(),
        };
        self.sign_and_broadcast(
            sender,
            vec![Any::pack(proto::MSG_EXECUTE_CONTRACT, &msg)],
            gas_limit.unwrap_or(self.gas.execute),
        )
        .await
    }
}
