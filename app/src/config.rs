//! Application configuration with TOML file support.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use shutter_utils::LogFormat;
use std::path::Path;

/// Configuration for a shuttermint application instance.
///
/// Loaded from a TOML file via [`AppConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Only [`ConsensusParams`] become part of
/// the replicated state; everything else is local to the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain id used until `init_chain` supplies the real one.
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Skip signature checks and the threshold bound on config votes.
    #[serde(default)]
    pub dev_mode: bool,

    /// Admission ceiling per sender and block.
    #[serde(default = "default_max_txs_per_block")]
    pub max_txs_per_block: usize,

    /// Voting power of a keyper once its config has started.
    #[serde(default = "default_validator_power")]
    pub validator_power: i64,

    /// Length of each DKG phase, in batches.
    #[serde(default = "default_dkg_phase_length")]
    pub dkg_phase_length: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The part of the configuration every node must agree on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub dev_mode: bool,
    pub validator_power: i64,
    pub dkg_phase_length: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_chain_id() -> String {
    "shutter-dev".to_string()
}

fn default_max_txs_per_block() -> usize {
    20
}

fn default_validator_power() -> i64 {
    10
}

fn default_dkg_phase_length() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AppError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(s).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_txs_per_block == 0 {
            return Err(AppError::Config("max_txs_per_block must be positive".into()));
        }
        if self.validator_power <= 0 {
            return Err(AppError::Config("validator_power must be positive".into()));
        }
        if self.dkg_phase_length == 0 {
            return Err(AppError::Config("dkg_phase_length must be positive".into()));
        }
        Ok(())
    }

    /// Install the global tracing subscriber with this config's format and level.
    pub fn init_logging(&self) -> Result<(), AppError> {
        shutter_utils::init_logging(self.log_format, &self.log_level).map_err(AppError::Config)
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        ConsensusParams {
            dev_mode: self.dev_mode,
            validator_power: self.validator_power,
            dkg_phase_length: self.dkg_phase_length,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            dev_mode: false,
            max_txs_per_block: default_max_txs_per_block(),
            validator_power: default_validator_power(),
            dkg_phase_length: default_dkg_phase_length(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
