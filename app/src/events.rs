//! Structured events returned with transaction results.
//!
//! Events are consumed by keypers and indexers watching the chain. They are
//! carried as string attributes, so binary values go through
//! [`encode_key_for_event`].

use crate::validators::ValidatorUpdate;
use serde::{Deserialize, Serialize};
use shutter_crypto::encode_key_for_event;
use shutter_types::{Address, BatchConfig, ValidatorPubkey};

pub const PUBKEY_GENERATED: &str = "shutter.pubkey-generated";
pub const BATCH_CONFIG: &str = "shutter.batch-config";
pub const BATCH_CONFIG_STARTED: &str = "shutter.batch-config-started";
pub const CHECK_IN: &str = "shutter.check-in";
pub const EON_STARTED: &str = "shutter.eon-started";
pub const POLY_EVAL: &str = "shutter.poly-eval";
pub const POLY_COMMITMENT: &str = "shutter.poly-commitment";
pub const ACCUSATION: &str = "shutter.accusation";
pub const APOLOGY: &str = "shutter.apology";
pub const DKG_FINALIZED: &str = "shutter.dkg-finalized";
pub const DKG_ABORTED: &str = "shutter.dkg-aborted";
pub const EPOCH_SECRET_KEY_SHARES: &str = "shutter.epoch-secret-key-shares";
pub const DECRYPTION_SIGNATURE: &str = "shutter.decryption-signature";
pub const VALIDATOR_UPDATED: &str = "shutter.validator-updated";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// A typed event with ordered string attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    /// Value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn join_encoded<'a>(values: impl IntoIterator<Item = &'a Vec<u8>>) -> String {
    values
        .into_iter()
        .map(|v| encode_key_for_event(v))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn pubkey_generated(batch_index: u64, pubkey: &[u8]) -> Event {
    Event::new(PUBKEY_GENERATED)
        .with("BatchIndex", batch_index)
        .with("Pubkey", encode_key_for_event(pubkey))
}

pub fn batch_config(config: &BatchConfig) -> Event {
    Event::new(BATCH_CONFIG)
        .with("StartBatchIndex", config.start_batch_index)
        .with("Threshold", config.threshold)
        .with("Keypers", join_addresses(&config.keypers))
        .with("ConfigIndex", config.config_index)
}

pub fn batch_config_started(config_index: u64) -> Event {
    Event::new(BATCH_CONFIG_STARTED).with("ConfigIndex", config_index)
}

pub fn check_in(sender: &Address, pubkey: &ValidatorPubkey) -> Event {
    Event::new(CHECK_IN)
        .with("Sender", sender)
        .with("ValidatorPubkey", pubkey)
}

pub fn eon_started(eon: u64, batch_index: u64, config_index: u64) -> Event {
    Event::new(EON_STARTED)
        .with("Eon", eon)
        .with("BatchIndex", batch_index)
        .with("ConfigIndex", config_index)
}

pub fn poly_eval(sender: &Address, eon: u64, receivers: &[Address], evals: &[Vec<u8>]) -> Event {
    Event::new(POLY_EVAL)
        .with("Sender", sender)
        .with("Eon", eon)
        .with("Receivers", join_addresses(receivers))
        .with("EncryptedEvals", join_encoded(evals))
}

pub fn poly_commitment(sender: &Address, eon: u64, gammas: &[Vec<u8>]) -> Event {
    Event::new(POLY_COMMITMENT)
        .with("Sender", sender)
        .with("Eon", eon)
        .with("Gammas", join_encoded(gammas))
}

pub fn accusation(sender: &Address, eon: u64, accused: &Address) -> Event {
    Event::new(ACCUSATION)
        .with("Sender", sender)
        .with("Eon", eon)
        .with("Accused", accused)
}

pub fn apology(sender: &Address, eon: u64, accuser: &Address, evaluation: &[u8]) -> Event {
    Event::new(APOLOGY)
        .with("Sender", sender)
        .with("Eon", eon)
        .with("Accuser", accuser)
        .with("Evaluation", encode_key_for_event(evaluation))
}

pub fn dkg_finalized(eon: u64, qualified: &[Address]) -> Event {
    Event::new(DKG_FINALIZED)
        .with("Eon", eon)
        .with("Qualified", join_addresses(qualified))
}

pub fn dkg_aborted(eon: u64, qualified: &[Address], threshold: u64) -> Event {
    Event::new(DKG_ABORTED)
        .with("Eon", eon)
        .with("Qualified", join_addresses(qualified))
        .with("Threshold", threshold)
}

pub fn epoch_secret_key_shares(eon: u64, epoch: u64, shares: &[(Address, Vec<u8>)]) -> Event {
    let senders: Vec<Address> = shares.iter().map(|(sender, _)| *sender).collect();
    Event::new(EPOCH_SECRET_KEY_SHARES)
        .with("Eon", eon)
        .with("Epoch", epoch)
        .with("Senders", join_addresses(&senders))
        .with("Shares", join_encoded(shares.iter().map(|(_, share)| share)))
}

pub fn decryption_signature(batch_index: u64, sender: &Address, signature: &[u8]) -> Event {
    Event::new(DECRYPTION_SIGNATURE)
        .with("BatchIndex", batch_index)
        .with("Sender", sender)
        .with("Signature", encode_key_for_event(signature))
}

pub fn validator_updated(update: &ValidatorUpdate) -> Event {
    Event::new(VALIDATOR_UPDATED)
        .with("ValidatorPubkey", update.pubkey)
        .with("Power", update.power)
}
