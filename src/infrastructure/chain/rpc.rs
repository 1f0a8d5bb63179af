//! Tendermint / CometBFT JSON-RPC transport.
//!
//! Speaks the four methods the deployer needs (`status`, `abci_query`,
//! `broadcast_tx_sync`, `tx`) over HTTP POST with reqwest. Numeric fields
//! arrive as JSON strings and byte fields as base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::errors::ChainError;
use crate::domain::models::{EventAttribute, TxEvent, TxResponse};

/// JSON-RPC client bound to one node endpoint
#[derive(Debug)]
pub struct RpcTransport {
    http: ReqwestClient,
    endpoint: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Subset of the `status` result
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub node_info: NodeInfo,
    #[serde(default)]
    pub sync_info: Option<SyncInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    /// Chain id served by the node
    pub network: String,
    #[serde(default)]
    pub moniker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncInfo {
    #[serde(default, deserialize_with = "u64_from_string")]
    pub latest_block_height: u64,
    #[serde(default)]
    pub catching_up: bool,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

/// CheckTx outcome of `broadcast_tx_sync`
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub log: String,
    /// Upper-case hex transaction hash
    pub hash: String,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    hash: String,
    #[serde(deserialize_with = "u64_from_string")]
    height: u64,
    tx_result: DeliverTx,
}

#[derive(Debug, Deserialize)]
struct DeliverTx {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    codespace: String,
    #[serde(default)]
    log: String,
    #[serde(default, deserialize_with = "u64_from_string")]
    gas_used: u64,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageLog {
    #[serde(default)]
    events: Vec<TxEvent>,
}

impl RpcTransport {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, ChainError> {
        let http = ReqwestClient::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn status(&self) -> Result<NodeStatus, ChainError> {
        self.call("status", json!({})).await
    }

    /// Raw ABCI query; returns the decoded `value` bytes
    #[instrument(skip(self, data), fields(endpoint = %self.endpoint))]
    pub async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let result: AbciQueryResult = self
            .call(
                "abci_query",
                json!({
                    "path": path,
                    "data": hex::encode(data),
                    "height": "0",
                    "prove": false,
                }),
            )
            .await?;

        let response = result.response;
        if response.code != 0 {
            return Err(ChainError::QueryFailed {
                code: response.code,
                log: response.log,
            });
        }

        match response.value {
            Some(value) if !value.is_empty() => STANDARD
                .decode(value)
                .map_err(|e| ChainError::Malformed(format!("abci_query value: {e}"))),
            _ => Ok(Vec::new()),
        }
    }

    /// Submit a signed transaction; CheckTx failures are returned as `TxRejected`
    #[instrument(skip(self, tx_bytes), fields(endpoint = %self.endpoint))]
    pub async fn broadcast_tx_sync(&self, tx_bytes: &[u8]) -> Result<BroadcastResult, ChainError> {
        let result: BroadcastResult = self
            .call("broadcast_tx_sync", json!({ "tx": STANDARD.encode(tx_bytes) }))
            .await?;

        if result.code != 0 {
            return Err(ChainError::TxRejected {
                code: result.code,
                codespace: result.codespace,
                log: result.log,
            });
        }
        Ok(result)
    }

    /// Look up an included transaction by hex hash
    ///
    /// Returns `NotIndexed` while the node does not know the hash yet and
    /// `TxRejected` when DeliverTx failed.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn tx(&self, hash: &str) -> Result<TxResponse, ChainError> {
        let hash_bytes =
            hex::decode(hash).map_err(|e| ChainError::Malformed(format!("tx hash {hash}: {e}")))?;

        let result: TxResult = match self
            .call(
                "tx",
                json!({ "hash": STANDARD.encode(hash_bytes), "prove": false }),
            )
            .await
        {
            Ok(result) => result,
            Err(ChainError::Rpc { message, data, .. })
                if message.contains("not found") || data.contains("not found") =>
            {
                return Err(ChainError::NotIndexed(hash.to_string()));
            }
            Err(err) => return Err(err),
        };

        let deliver = result.tx_result;
        if deliver.code != 0 {
            return Err(ChainError::TxRejected {
                code: deliver.code,
                codespace: deliver.codespace,
                log: deliver.log,
            });
        }

        let events = events_from_log(&deliver.log).unwrap_or_else(|| decode_events(deliver.events));

        Ok(TxResponse {
            hash: result.hash,
            height: result.height,
            gas_used: deliver.gas_used,
            events,
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "POST {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(method, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(method, &e))?;

        // Tendermint answers JSON-RPC errors with HTTP 500 and an error body
        let envelope: RpcEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ChainError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(ChainError::Malformed(format!("{method}: {e}"))),
        };

        if let Some(error) = envelope.error {
            let data = match error.data {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
                data,
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| ChainError::Malformed(format!("{method}: missing result")))?;
        serde_json::from_value(result).map_err(|e| ChainError::Malformed(format!("{method}: {e}")))
    }
}

fn classify_reqwest_error(method: &str, err: &reqwest::Error) -> ChainError {
    if err.is_timeout() {
        ChainError::Timeout(method.to_string())
    } else {
        ChainError::Transport(format!("{method}: {err}"))
    }
}

/// Events of a pre-0.50 SDK `log` field (JSON array of message logs)
fn events_from_log(log: &str) -> Option<Vec<TxEvent>> {
    let logs: Vec<MessageLog> = serde_json::from_str(log).ok()?;
    let events: Vec<TxEvent> = logs.into_iter().flat_map(|l| l.events).collect();
    (!events.is_empty()).then_some(events)
}

/// Events of `tx_result.events`, decoding Tendermint 0.34 base64 attributes
fn decode_events(raw: Vec<RawEvent>) -> Vec<TxEvent> {
    let base64_encoded = raw
        .iter()
        .flat_map(|event| event.attributes.iter())
        .filter_map(|attr| attr.key.as_deref())
        .all(|key| decode_attribute(key).is_some_and(|k| is_attribute_key(&k)))
        && raw.iter().any(|event| !event.attributes.is_empty());

    raw.into_iter()
        .map(|event| TxEvent {
            kind: event.kind,
            attributes: event
                .attributes
                .into_iter()
                .map(|attr| {
                    let key = attr.key.unwrap_or_default();
                    let value = attr.value.unwrap_or_default();
                    if base64_encoded {
                        EventAttribute {
                            key: decode_attribute(&key).unwrap_or(key),
                            value: decode_attribute(&value).unwrap_or(value),
                        }
                    } else {
                        EventAttribute { key, value }
                    }
                })
                .collect(),
        })
        .collect()
}

fn decode_attribute(raw: &str) -> Option<String> {
    let bytes = STANDARD.decode(raw).ok()?;
    String::from_utf8(bytes).ok()
}

fn is_attribute_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Accepts `"123"`, `123` and missing values
fn u64_from_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("negative number")),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("expected number, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: &str, attrs: &[(&str, &str)]) -> RawEvent {
        RawEvent {
            kind: kind.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| RawAttribute {
                    key: Some((*k).to_string()),
                    value: Some((*v).to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_plain_attributes_are_kept() {
        let events = decode_events(vec![raw(
            "instantiate",
            &[("_contract_address", "juno1abc"), ("code_id", "12")],
        )]);
        assert_eq!(events[0].attribute("_contract_address"), Some("juno1abc"));
        assert_eq!(events[0].attribute("code_id"), Some("12"));
    }

    #[test]
    fn test_base64_attributes_are_decoded() {
        let (addr_key, addr) = (STANDARD.encode("_contract_address"), STANDARD.encode("juno1abc"));
        let (code_key, code) = (STANDARD.encode("code_id"), STANDARD.encode("12"));
        let events = decode_events(vec![raw(
            "instantiate",
            &[(addr_key.as_str(), addr.as_str()), (code_key.as_str(), code.as_str())],
        )]);
        assert_eq!(events[0].attribute("_contract_address"), Some("juno1abc"));
        assert_eq!(events[0].attribute("code_id"), Some("12"));
    }

    #[test]
    fn test_events_from_message_log() {
        let log = r#"[{"msg_index":0,"events":[{"type":"store_code","attributes":[{"key":"code_id","value":"9"}]}]}]"#;
        let events = events_from_log(log).unwrap();
        assert_eq!(events[0].kind, "store_code");
        assert_eq!(events[0].attribute("code_id"), Some("9"));
        assert!(events_from_log("").is_none());
        assert!(events_from_log("out of gas").is_none());
    }

    #[test]
    fn test_numeric_strings() {
        let info: SyncInfo =
            serde_json::from_value(json!({"latest_block_height": "1234", "catching_up": false}))
                .unwrap();
        assert_eq!(info.latest_block_height, 1234);
        let info: SyncInfo = serde_json::from_value(json!({"latest_block_height": 7})).unwrap();
        assert_eq!(info.latest_block_height, 7);
    }
}
