use serde::{Deserialize, Serialize};

use super::chain::Coin;

/// Fee token of a network, as published by the chain registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeToken {
    /// Denomination used for fees and account funding (e.g. `ujunox`)
    pub denom: String,

    /// Suggested gas price in `denom` per unit of gas
    #[serde(default = "default_average_gas_price")]
    pub average_gas_price: f64,
}

const fn default_average_gas_price() -> f64 {
    0.025
}

/// Immutable descriptor of one target network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Registry name of the chain, used for artifact file names (e.g. `junotestnet`)
    pub chain_name: String,

    /// Human readable name used in log lines
    #[serde(default)]
    pub pretty_name: String,

    /// Chain id reported by the nodes (e.g. `uni-6`)
    pub chain_id: String,

    /// Bech32 address prefix
    pub bech32_prefix: String,

    /// Candidate RPC endpoints, raced at session bootstrap
    #[serde(default)]
    pub rpc: Vec<String>,

    /// Fee token used for gas and funding
    pub fee_token: FeeToken,
}

impl Network {
    pub fn display_name(&self) -> &str {
        if self.pretty_name.is_empty() {
            &self.chain_name
        } else {
            &self.pretty_name
        }
    }

    pub fn denom(&self) -> &str {
        &self.fee_token.denom
    }

    pub fn gas_price(&self) -> GasPrice {
        GasPrice {
            amount: self.fee_token.average_gas_price,
            denom: self.fee_token.denom.clone(),
        }
    }
}

/// Gas price used to compute transaction fees
#[derive(Debug, Clone, PartialEq)]
pub struct GasPrice {
    pub amount: f64,
    pub denom: String,
}

impl GasPrice {
    /// Fee for the given gas limit, rounded up to the next whole unit
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn fee_for(&self, gas_limit: u64) -> Coin {
        let amount = (gas_limit as f64 * self.amount).ceil().max(0.0) as u128;
        Coin::new(amount, &self.denom)
    }
}
