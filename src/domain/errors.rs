//! Error taxonomy of the deployer.
//!
//! Failures never cross network boundaries: each variant family maps to the
//! scope it aborts (a whole network, the remaining pipeline stages, or a
//! single validator step).

use std::path::PathBuf;
use thiserror::Error;

/// Chain transport and transaction errors
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message} {data}")]
    Rpc {
        code: i64,
        message: String,
        data: String,
    },

    #[error("Transaction {0} not yet indexed")]
    NotIndexed(String),

    #[error("Transaction {hash} not confirmed after {waited_ms}ms")]
    TxTimeout { hash: String, waited_ms: u64 },

    #[error("Transaction rejected (code {code}, codespace '{codespace}'): {log}")]
    TxRejected {
        code: u32,
        codespace: String,
        log: String,
    },

    #[error("Query failed (code {code}): {log}")]
    QueryFailed { code: u32, log: String },

    #[error("Account {0} not found on chain")]
    AccountNotFound(String),

    #[error("No signing key for {0}")]
    UnknownSigner(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error(transparent)]
    AddressResolution(#[from] AddressResolutionError),
}

impl ChainError {
    /// Whether the failed call is safe to repeat unchanged
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::NotIndexed(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Network session bootstrap failures; the network is skipped
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("No live endpoint among {} candidates for {network}", .attempts.len())]
    NoLiveEndpoint {
        network: String,
        /// `url: reason` of every failed probe
        attempts: Vec<String>,
    },

    #[error("Wallet derivation failed: {0}")]
    WalletDerivationFailed(String),

    #[error("Client connect to {endpoint} failed: {reason}")]
    ClientConnectFailed { endpoint: String, reason: String },
}

/// Funding equalizer failures; the network is aborted before deployment
#[derive(Debug, Error)]
pub enum FundingError {
    #[error(
        "Insufficient deployer funds: balance {balance}{denom}, required {required}{denom}"
    )]
    InsufficientDeployerFunds {
        balance: u128,
        required: u128,
        denom: String,
    },

    #[error("Balance query for {role} failed: {source}")]
    BalanceQuery {
        role: String,
        #[source]
        source: ChainError,
    },

    #[error("Transfer to {role} ({address}) failed: {source}")]
    Transfer {
        role: String,
        address: String,
        #[source]
        source: ChainError,
    },
}

/// Contract address could not be read from an instantiate transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressResolutionError {
    #[error("No instantiate event with a contract address")]
    NoInstantiateEvent,

    #[error("Ambiguous instantiate events: {}", .0.join(", "))]
    Ambiguous(Vec<String>),
}

/// Build metadata (wasm, checksum, version) could not be resolved
#[derive(Debug, Error)]
pub enum BuildInfoError {
    #[error("Wasm file not found: {}", .0.display())]
    WasmNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid version '{value}' for {contract}")]
    InvalidVersion { contract: String, value: String },
}

/// Pipeline stage failures; remaining stages of the network are skipped
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("{stage}: build metadata unavailable: {source}")]
    BuildInfo {
        stage: String,
        #[source]
        source: BuildInfoError,
    },

    #[error("{stage}: upload failed: {source}")]
    Upload {
        stage: String,
        #[source]
        source: ChainError,
    },

    #[error("{stage}: instantiate failed: {source}")]
    Instantiate {
        stage: String,
        #[source]
        source: ChainError,
    },

    #[error("{stage}: address resolution failed: {source}")]
    AddressResolutionFailed {
        stage: String,
        #[source]
        source: AddressResolutionError,
    },

    #[error("{stage}: requires {dependency}, which was not deployed")]
    MissingDependency { stage: String, dependency: String },

    #[error("{stage}: failed to encode instantiate message: {reason}")]
    Encode { stage: String, reason: String },
}

/// Read-only registry query failures
#[derive(Debug, Error)]
pub enum RegistryQueryError {
    #[error("Registry query '{query}' failed: {source}")]
    Query {
        query: String,
        #[source]
        source: ChainError,
    },

    #[error("Registry has no '{0}' contract")]
    MissingContract(String),

    #[error("No deployed factory recorded for {0}")]
    NoFactory(String),
}

/// Failed lifecycle scenario step
#[derive(Debug, Error)]
pub enum ValidationFailure {
    #[error("expected {expected}, observed {actual}")]
    Assertion { expected: String, actual: String },

    #[error("timed out after {waited_ms}ms, last observed {last}")]
    TimedOut { waited_ms: u64, last: String },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Registry(#[from] RegistryQueryError),
}

impl From<serde_json::Error> for ValidationFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::Chain(err.into())
    }
}

impl ValidationFailure {
    pub fn assertion(expected: impl ToString, actual: impl ToString) -> Self {
        Self::Assertion {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Artifact store read/write failures
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact file {} is not readable: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact file {} is malformed: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
