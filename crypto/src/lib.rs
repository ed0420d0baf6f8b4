//! Cryptographic primitives for shuttermint.
//!
//! - **Ed25519** for transaction signing and verification
//! - **Blake2b-256** for hashing (address derivation, application state hash)
//! - Keyper address derivation from signing keys
//! - A reversible, text-safe encoding of key material carried in events

pub mod address;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::derive_address;
pub use encoding::{decode_key_from_event, encode_key_for_event, EVENT_ALPHABET};
pub use error::CryptoError;
pub use hash::blake2b_256;
pub use keys::keypair_from_seed;
pub use sign::{sign_message, verify_signature};
