//! Batch configurations and per-batch state.

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// The keyper configuration governing a consecutive range of batches.
///
/// Mirrors the configurations stored in the config contract on the main
/// chain. The zero value is the registry guard: no keypers, threshold 0,
/// starting at batch 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub keypers: Vec<Address>,
    pub start_batch_index: u64,
    pub threshold: u64,

    pub config_index: u64,
    pub config_contract_address: Address,

    /// Set once enough keypers have confirmed the config is live.
    pub started: bool,
    /// Set once the validator set has been handed to the consensus engine.
    pub validators_updated: bool,
}

impl BatchConfig {
    pub fn is_keyper(&self, address: &Address) -> bool {
        self.keypers.contains(address)
    }

    pub fn keyper_count(&self) -> usize {
        self.keypers.len()
    }

    /// Whether two configs describe the same keyper set and parameters,
    /// ignoring the activation flags.
    pub fn same_content(&self, other: &BatchConfig) -> bool {
        self.keypers == other.keypers
            && self.start_batch_index == other.start_batch_index
            && self.threshold == other.threshold
            && self.config_index == other.config_index
            && self.config_contract_address == other.config_contract_address
    }
}

/// A decryption key signature created by one of the keypers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionSignature {
    pub sender: Address,
    pub signature: Vec<u8>,
}

/// A batch together with the config governing it and the decryption
/// signatures collected for it so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchState {
    pub batch_index: u64,
    pub config: BatchConfig,
    pub decryption_signatures: Vec<DecryptionSignature>,
}

impl BatchState {
    pub fn new(batch_index: u64, config: BatchConfig) -> Self {
        Self {
            batch_index,
            config,
            decryption_signatures: Vec::new(),
        }
    }

    pub fn has_signature_from(&self, sender: &Address) -> bool {
        self.decryption_signatures.iter().any(|s| &s.sender == sender)
    }
}
