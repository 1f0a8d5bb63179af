//! Chain-level value types shared by the signing and query ports.

use serde::{Deserialize, Serialize};

use crate::domain::errors::AddressResolutionError;

/// Native coin amount, serialized the way CosmWasm contracts expect it
/// (`amount` as a decimal string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }

    /// Parsed amount, zero when the string is not a valid integer
    pub fn amount_u128(&self) -> u128 {
        self.amount.parse().unwrap_or_default()
    }
}

/// Single key/value attribute of a transaction event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// Event emitted while executing a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

impl TxEvent {
    pub fn new(kind: impl Into<String>, attributes: &[(&str, &str)]) -> Self {
        Self {
            kind: kind.into(),
            attributes: attributes
                .iter()
                .map(|(key, value)| EventAttribute {
                    key: (*key).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }

    /// First value of the attribute named `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// Result of a transaction that was included in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub hash: String,
    pub height: u64,
    pub gas_used: u64,
    pub events: Vec<TxEvent>,
}

impl TxResponse {
    /// Events of the given type, in emission order
    pub fn events_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a TxEvent> + 'a {
        self.events.iter().filter(move |event| event.kind == kind)
    }

    /// Code id reported by the `store_code` event of an upload
    pub fn code_id(&self) -> Option<u64> {
        self.events_of("store_code")
            .find_map(|event| event.attribute("code_id"))
            .and_then(|value| value.trim().parse().ok())
    }

    /// Address of the single contract instantiated by this transaction
    ///
    /// Only `instantiate` events are considered. When `code_id` is given,
    /// events carrying a different `code_id` attribute are ignored. Exactly
    /// one distinct `_contract_address` must remain.
    pub fn instantiated_address(
        &self,
        code_id: Option<u64>,
    ) -> Result<String, AddressResolutionError> {
        let mut candidates: Vec<String> = Vec::new();
        for event in self.events_of("instantiate") {
            let matches_code = match (code_id, event.attribute("code_id")) {
                (Some(expected), Some(actual)) => actual.trim().parse::<u64>() == Ok(expected),
                _ => true,
            };
            if !matches_code {
                continue;
            }
            if let Some(address) = event.attribute("_contract_address") {
                if !address.is_empty() && !candidates.iter().any(|c| c == address) {
                    candidates.push(address.to_string());
                }
            }
        }

        match candidates.len() {
            0 => Err(AddressResolutionError::NoInstantiateEvent),
            1 => Ok(candidates.remove(0)),
            _ => Err(AddressResolutionError::Ambiguous(candidates)),
        }
    }
}

/// Result of a code upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub code_id: u64,
    pub tx: TxResponse,
}

/// Result of a direct contract instantiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiateResult {
    pub address: String,
    pub tx: TxResponse,
}
