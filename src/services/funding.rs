//! Funding equalizer: tops up under-funded session accounts from the deployer.

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::domain::errors::FundingError;
use crate::domain::models::{AccountRole, Coin};
use crate::services::session::NetworkSession;

/// Balance of one named account before equalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub role: AccountRole,
    pub address: String,
    pub balance: u128,
}

/// Transfer sent by the equalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub role: AccountRole,
    pub address: String,
    pub amount: u128,
    pub tx_hash: String,
}

/// Outcome of one equalization pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EqualizeResult {
    pub balances: Vec<AccountBalance>,
    pub transfers: Vec<Transfer>,
}

/// Brings every non-deployer account of a session up to a target balance
#[derive(Debug, Clone, Copy)]
pub struct FundingEqualizer {
    target_amount: u128,
}

impl FundingEqualizer {
    pub const fn new(target_amount: u128) -> Self {
        Self { target_amount }
    }

    /// Read every balance, check the deployer can cover all accounts, then
    /// send one transfer per deficient account
    ///
    /// Transfers are sent one after another: they share the deployer's
    /// account sequence. Accounts already at or above the target receive
    /// nothing.
    #[instrument(skip(self, session), fields(network = %session.chain_name()))]
    pub async fn equalize(&self, session: &NetworkSession) -> Result<EqualizeResult, FundingError> {
        let balances = self.read_balances(session).await?;
        let denom = session.denom();

        let deployer_balance = balances
            .iter()
            .find(|b| b.role == AccountRole::Deployer)
            .map_or(0, |b| b.balance);
        let others = balances.len().saturating_sub(1) as u128;
        let required = self.target_amount.saturating_mul(others);

        if deployer_balance < required {
            error!(
                network = %session.chain_name(),
                balance = deployer_balance,
                required,
                denom,
                outcome = "ERROR",
                "Deployer cannot fund session accounts"
            );
            return Err(FundingError::InsufficientDeployerFunds {
                balance: deployer_balance,
                required,
                denom: denom.to_string(),
            });
        }

        let mut transfers = Vec::new();
        for account in balances.iter().filter(|b| b.role != AccountRole::Deployer) {
            if account.balance >= self.target_amount {
                continue;
            }
            let amount = self.target_amount - account.balance;

            let tx = session
                .signer()
                .send_tokens(session.deployer(), &account.address, Coin::new(amount, denom))
                .await
                .map_err(|source| {
                    error!(
                        network = %session.chain_name(),
                        role = %account.role,
                        error = %source,
                        outcome = "ERROR",
                        "Funding transfer failed"
                    );
                    FundingError::Transfer {
                        role: account.role.to_string(),
                        address: account.address.clone(),
                        source,
                    }
                })?;

            info!(
                network = %session.chain_name(),
                role = %account.role,
                address = %account.address,
                amount,
                denom,
                tx_hash = %tx.hash,
                outcome = "SUCCESS",
                "Funded account"
            );
            transfers.push(Transfer {
                role: account.role,
                address: account.address.clone(),
                amount,
                tx_hash: tx.hash,
            });
        }

        Ok(EqualizeResult {
            balances,
            transfers,
        })
    }

    /// Balances of every named account, read concurrently
    pub async fn read_balances(&self, session: &NetworkSession) -> Result<Vec<AccountBalance>, FundingError> {
        let denom = session.denom();
        try_join_all(session.accounts().iter().map(|(role, address)| async move {
            let balance = session
                .querier()
                .balance(address, denom)
                .await
                .map_err(|source| FundingError::BalanceQuery {
                    role: role.to_string(),
                    source,
                })?;
            Ok(AccountBalance {
                role,
                address: address.to_string(),
                balance,
            })
        }))
        .await
    }
}
