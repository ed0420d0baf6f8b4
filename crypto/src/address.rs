//! Keyper address derivation from signing keys.
//!
//! Address = last 20 bytes of Blake2b-256(public_key).

use shutter_types::{Address, PublicKey};

/// Derive the keyper address that owns `public_key`.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let hash = crate::blake2b_256(public_key.as_bytes());
    let mut bytes = [0u8; Address::LEN];
    bytes.copy_from_slice(&hash[32 - Address::LEN..]);
    Address::new(bytes)
}
