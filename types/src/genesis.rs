//! Genesis descriptor used to seed the first real batch config.

use crate::address::Address;
use crate::error::ShutterError;
use serde::{Deserialize, Serialize};

fn default_start_batch_index() -> u64 {
    1
}

/// The initial keypers and threshold that bootstrap the system by voting
/// on the first real `BatchConfig`.
///
/// Keypers are kept as hex strings so the JSON form stays human editable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAppState {
    pub keypers: Vec<String>,
    pub threshold: u64,
    #[serde(default = "default_start_batch_index")]
    pub start_batch_index: u64,
}

impl GenesisAppState {
    pub fn new(keypers: &[Address], threshold: u64) -> Self {
        Self {
            keypers: keypers.iter().map(|k| k.to_string()).collect(),
            threshold,
            start_batch_index: default_start_batch_index(),
        }
    }

    /// Parse the app state from the JSON blob handed over by the consensus engine.
    pub fn from_json(raw: &[u8]) -> Result<Self, ShutterError> {
        serde_json::from_slice(raw).map_err(|e| ShutterError::InvalidGenesis(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ShutterError> {
        serde_json::to_vec(self).map_err(|e| ShutterError::Serialization(e.to_string()))
    }

    /// The keypers as parsed addresses.
    pub fn keyper_addresses(&self) -> Result<Vec<Address>, ShutterError> {
        self.keypers.iter().map(|k| k.parse()).collect()
    }
}
