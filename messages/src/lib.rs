//! Transaction kinds keypers submit to the shuttermint application.
//!
//! Every transaction is a [`SignedMessage`] wrapping one [`Message`]; the
//! application routes on [`Message::kind`].

pub mod codec;
pub mod envelope;
pub mod error;

pub use codec::{decode_tx, encode_tx, MAX_TX_SIZE};
pub use envelope::SignedMessage;
pub use error::MessageError;

use serde::{Deserialize, Serialize};
use shutter_types::{Address, BatchConfig};
use std::fmt;

/// All keyper transaction payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    // Configuration
    BatchConfig(BatchConfigMsg),
    BatchConfigStarted(BatchConfigStartedMsg),
    CheckIn(CheckInMsg),
    EonStartVote(EonStartVoteMsg),

    // DKG
    PolyEval(PolyEvalMsg),
    PolyCommitment(PolyCommitmentMsg),
    Accusation(AccusationMsg),
    Apology(ApologyMsg),

    // Threshold aggregation
    PublicKeyCommitment(PublicKeyCommitmentMsg),
    EpochSecretKeyShare(EpochSecretKeyShareMsg),
    DecryptionSignature(DecryptionSignatureMsg),
}

/// Discriminant of [`Message`], used for routing, admission and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    BatchConfig,
    BatchConfigStarted,
    CheckIn,
    EonStartVote,
    PolyEval,
    PolyCommitment,
    Accusation,
    Apology,
    PublicKeyCommitment,
    EpochSecretKeyShare,
    DecryptionSignature,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BatchConfig => "config-vote",
            Self::BatchConfigStarted => "batch-config-started",
            Self::CheckIn => "check-in",
            Self::EonStartVote => "eon-start-vote",
            Self::PolyEval => "poly-eval",
            Self::PolyCommitment => "poly-commitment",
            Self::Accusation => "accusation",
            Self::Apology => "apology",
            Self::PublicKeyCommitment => "public-key-commitment",
            Self::EpochSecretKeyShare => "epoch-secret-key-share",
            Self::DecryptionSignature => "decryption-signature",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::BatchConfig(_) => MessageKind::BatchConfig,
            Self::BatchConfigStarted(_) => MessageKind::BatchConfigStarted,
            Self::CheckIn(_) => MessageKind::CheckIn,
            Self::EonStartVote(_) => MessageKind::EonStartVote,
            Self::PolyEval(_) => MessageKind::PolyEval,
            Self::PolyCommitment(_) => MessageKind::PolyCommitment,
            Self::Accusation(_) => MessageKind::Accusation,
            Self::Apology(_) => MessageKind::Apology,
            Self::PublicKeyCommitment(_) => MessageKind::PublicKeyCommitment,
            Self::EpochSecretKeyShare(_) => MessageKind::EpochSecretKeyShare,
            Self::DecryptionSignature(_) => MessageKind::DecryptionSignature,
        }
    }
}

/// A vote for the next batch config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfigMsg {
    pub start_batch_index: u64,
    pub keypers: Vec<Address>,
    pub threshold: u64,
    pub config_index: u64,
    pub config_contract_address: Address,
}

impl BatchConfigMsg {
    /// The (not yet started) config this vote proposes.
    pub fn to_batch_config(&self) -> BatchConfig {
        BatchConfig {
            keypers: self.keypers.clone(),
            start_batch_index: self.start_batch_index,
            threshold: self.threshold,
            config_index: self.config_index,
            config_contract_address: self.config_contract_address,
            started: false,
            validators_updated: false,
        }
    }
}

/// A keyper's confirmation that the config with `config_index` is live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfigStartedMsg {
    pub config_index: u64,
}

/// Registers the consensus validator key a keyper will use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInMsg {
    pub validator_pubkey: Vec<u8>,
}

/// A vote for the batch index at which the next eon starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EonStartVoteMsg {
    pub start_batch_index: u64,
}

/// Encrypted polynomial evaluations a dealer sends to the other keypers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyEvalMsg {
    pub eon: u64,
    pub receivers: Vec<Address>,
    pub encrypted_evals: Vec<Vec<u8>>,
}

/// Feldman commitments to a dealer's polynomial coefficients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyCommitmentMsg {
    pub eon: u64,
    pub gammas: Vec<Vec<u8>>,
}

/// Claims that the evaluation `accused` dealt to the sender is invalid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccusationMsg {
    pub eon: u64,
    pub accused: Address,
    pub evaluation: Vec<u8>,
}

/// Answers an accusation by revealing the disputed evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApologyMsg {
    pub eon: u64,
    pub accuser: Address,
    pub evaluation: Vec<u8>,
}

/// A keyper's view of the eon public key for a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCommitmentMsg {
    pub batch_index: u64,
    pub commitment: Vec<u8>,
}

/// A keyper's share of the secret key of one epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSecretKeyShareMsg {
    pub eon: u64,
    pub epoch: u64,
    pub share: Vec<u8>,
}

/// A keyper's signature over the decryption key of a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionSignatureMsg {
    pub batch_index: u64,
    pub signature: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_distinct_names() {
        let kinds = [
            MessageKind::BatchConfig,
            MessageKind::BatchConfigStarted,
            MessageKind::CheckIn,
            MessageKind::EonStartVote,
            MessageKind::PolyEval,
            MessageKind::PolyCommitment,
            MessageKind::Accusation,
            MessageKind::Apology,
            MessageKind::PublicKeyCommitment,
            MessageKind::EpochSecretKeyShare,
            MessageKind::DecryptionSignature,
        ];
        let names: std::collections::BTreeSet<_> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), kinds.len());
    }

    #[test]
    fn batch_config_msg_builds_unstarted_config() {
        let msg = BatchConfigMsg {
            start_batch_index: 100,
            keypers: vec![Address::new([1; 20])],
            threshold: 1,
            config_index: 2,
            config_contract_address: Address::new([9; 20]),
        };
        let config = msg.to_batch_config();
        assert_eq!(config.start_batch_index, 100);
        assert_eq!(config.config_index, 2);
        assert!(!config.started);
        assert!(!config.validators_updated);
    }

    #[test]
    fn kind_matches_variant() {
        let msg = Message::EonStartVote(EonStartVoteMsg { start_batch_index: 5 });
        assert_eq!(msg.kind(), MessageKind::EonStartVote);
        assert_eq!(msg.kind().to_string(), "eon-start-vote");
    }
}
