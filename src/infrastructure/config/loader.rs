use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project configuration file
pub const CONFIG_FILE: &str = "deploy.yaml";

/// Optional local overrides, not meant to be committed
pub const LOCAL_CONFIG_FILE: &str = "deploy.local.yaml";

/// Variables read verbatim from the environment
const RAW_ENV_KEYS: [&str; 5] = [
    "SEED_PHRASE",
    "SUPPORTED_NETWORKS",
    "RPC_ENDPOINT",
    "DENOM",
    "PREFIX",
];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid network '{network}': {reason}")]
    InvalidNetwork { network: String, reason: String },

    #[error("No networks configured")]
    NoNetworks,

    #[error("Invalid gas limit for {0}: must be positive")]
    InvalidGasLimit(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. deploy.yaml in the working directory, or the file passed with `--config`
    /// 3. deploy.local.yaml (optional local overrides)
    /// 4. DEPLOY_* environment variables (`__` separates nested keys)
    /// 5. Deployment inputs read verbatim: SEED_PHRASE, SUPPORTED_NETWORKS,
    ///    RPC_ENDPOINT, DENOM, PREFIX, WASM_BUILD_FOLDER, PAUSE_ADMIN_<NETWORK>
    pub fn load(config_file: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(config_file)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(config_file: Option<&Path>) -> Figment {
        let project_file = config_file.map_or_else(|| Path::new(CONFIG_FILE).to_path_buf(), Path::to_path_buf);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project_file))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed("DEPLOY_").split("__"))
            .merge(Env::raw().only(&RAW_ENV_KEYS))
            .merge(
                Env::raw()
                    .only(&["WASM_BUILD_FOLDER"])
                    .map(|_| "artifacts.dir".into()),
            )
            .merge(
                Env::prefixed("PAUSE_ADMIN_")
                    .map(|key| format!("pause_admins.{}", key.as_str().to_lowercase()).into()),
            )
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.networks.is_empty() {
            return Err(ConfigError::NoNetworks);
        }

        for network in &config.networks {
            let invalid = |reason: &str| ConfigError::InvalidNetwork {
                network: network.chain_name.clone(),
                reason: reason.to_string(),
            };
            if network.chain_name.is_empty() {
                return Err(invalid("chain_name cannot be empty"));
            }
            if network.chain_id.is_empty() {
                return Err(invalid("chain_id cannot be empty"));
            }
            if network.bech32_prefix.is_empty() {
                return Err(invalid("bech32_prefix cannot be empty"));
            }
            if network.fee_token.denom.is_empty() {
                return Err(invalid("fee token denom cannot be empty"));
            }
            if !network.fee_token.average_gas_price.is_finite()
                || network.fee_token.average_gas_price < 0.0
            {
                return Err(invalid("average_gas_price must be a non-negative number"));
            }
        }

        if let Some(supported) = &config.supported_networks {
            if let Err(unknown) = config.resolve_networks(None) {
                return Err(ConfigError::ValidationFailed(format!(
                    "supported_networks '{supported}' names unknown network '{unknown}'"
                )));
            }
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        // Validate retry config
        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        let gas = &config.gas;
        for (name, limit) in [
            ("upload", gas.upload),
            ("instantiate", gas.instantiate),
            ("deploy", gas.deploy),
            ("execute", gas.execute),
            ("send", gas.send),
        ] {
            if limit == 0 {
                return Err(ConfigError::InvalidGasLimit(name));
            }
        }

        if config.tx.poll_interval_ms == 0 || config.tx.confirm_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "tx poll_interval_ms and confirm_timeout_ms must be positive".to_string(),
            ));
        }

        if config.funding.target_amount == 0 {
            return Err(ConfigError::ValidationFailed(
                "funding target_amount must be positive".to_string(),
            ));
        }

        if config.validator.task_funds.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "validator task_funds cannot be empty".to_string(),
            ));
        }

        if config.validator.nomination_initial_backoff_ms > config.validator.nomination_max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.validator.nomination_initial_backoff_ms,
                config.validator.nomination_max_backoff_ms,
            ));
        }

        Ok(())
    }
}
