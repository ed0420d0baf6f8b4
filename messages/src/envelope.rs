//! Signed transaction envelope.

use crate::error::MessageError;
use crate::Message;
use serde::{Deserialize, Serialize};
use shutter_crypto::{derive_address, sign_message, verify_signature};
use shutter_types::{Address, KeyPair, PublicKey, Signature};

/// A keyper transaction: one message, bound to a chain and a random nonce,
/// signed by the keyper's Ed25519 key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub chain_id: String,
    pub nonce: u64,
    pub signer: PublicKey,
    pub message: Message,
    pub signature: Signature,
}

/// The bytes covered by the signature: `(chain_id, nonce, message)`.
fn signing_bytes(chain_id: &str, nonce: u64, message: &Message) -> Result<Vec<u8>, MessageError> {
    bincode::serialize(&(chain_id, nonce, message)).map_err(|e| MessageError::Malformed(e.to_string()))
}

impl SignedMessage {
    /// Sign `message` for `chain_id` with the given nonce.
    pub fn sign(
        chain_id: impl Into<String>,
        nonce: u64,
        message: Message,
        keypair: &KeyPair,
    ) -> Result<Self, MessageError> {
        let chain_id = chain_id.into();
        let bytes = signing_bytes(&chain_id, nonce, &message)?;
        let signature = sign_message(&bytes, &keypair.private);
        Ok(Self {
            chain_id,
            nonce,
            signer: keypair.public.clone(),
            message,
            signature,
        })
    }

    /// The keyper address the signer key belongs to.
    pub fn sender(&self) -> Address {
        derive_address(&self.signer)
    }

    /// Check the signature and return the sender address.
    pub fn verify(&self) -> Result<Address, MessageError> {
        let bytes = signing_bytes(&self.chain_id, self.nonce, &self.message)?;
        if !verify_signature(&bytes, &self.signature, &self.signer) {
            return Err(MessageError::InvalidSignature(self.sender().to_string()));
        }
        Ok(self.sender())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CheckInMsg, EonStartVoteMsg};
    use shutter_crypto::keypair_from_seed;

    fn vote(start: u64) -> Message {
        Message::EonStartVote(EonStartVoteMsg { start_batch_index: start })
    }

    #[test]
    fn signed_message_verifies() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let tx = SignedMessage::sign("shutter-test", 7, vote(10), &kp).unwrap();
        assert_eq!(tx.verify().unwrap(), derive_address(&kp.public));
    }

    #[test]
    fn tampered_payload_fails() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let mut tx = SignedMessage::sign("shutter-test", 7, vote(10), &kp).unwrap();
        tx.message = vote(11);
        assert!(matches!(tx.verify(), Err(MessageError::InvalidSignature(_))));
    }

    #[test]
    fn signature_binds_chain_and_nonce() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let tx = SignedMessage::sign(
            "shutter-test",
            7,
            Message::CheckIn(CheckInMsg { validator_pubkey: vec![3; 32] }),
            &kp,
        )
        .unwrap();

        let mut other_chain = tx.clone();
        other_chain.chain_id = "other".into();
        assert!(other_chain.verify().is_err());

        let mut other_nonce = tx;
        other_nonce.nonce = 8;
        assert!(other_nonce.verify().is_err());
    }

    #[test]
    fn foreign_signer_fails() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let impostor = keypair_from_seed(&[2u8; 32]);
        let mut tx = SignedMessage::sign("shutter-test", 1, vote(1), &kp).unwrap();
        tx.signer = impostor.public.clone();
        assert!(tx.verify().is_err());
    }
}
