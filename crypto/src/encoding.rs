//! Text-safe encoding of key material carried in transaction events.
//!
//! Events travel as string attributes in the consensus engine's transaction
//! results, so binary keys are rendered in unpadded base32 over an alphabet of
//! lowercase letters and digits (visually ambiguous `0`, `2`, `l` and `v` are
//! left out). The encoding is canonical: every byte string has exactly one
//! encoding and decoding rejects anything else, so `decode(encode(k)) == k`.

use crate::error::CryptoError;

/// Base32 alphabet used for event attributes.
pub const EVENT_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const DECODE_TABLE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[EVENT_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Encode key bytes for an event attribute.
///
/// Every 5 input bytes become 8 symbols. A short final group is zero filled
/// on the right and only the symbols covering its bits are emitted.
pub fn encode_key_for_event(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity((bytes.len() * 8).div_ceil(5));
    for group in bytes.chunks(5) {
        let mut word = [0u8; 8];
        word[3..3 + group.len()].copy_from_slice(group);
        let bits = u64::from_be_bytes(word);

        let symbols = (group.len() * 8).div_ceil(5);
        for i in 0..symbols {
            let symbol = (bits >> (35 - 5 * i)) & 0x1F;
            encoded.push(char::from(EVENT_ALPHABET[symbol as usize]));
        }
    }
    encoded
}

/// Decode key bytes from an event attribute produced by [`encode_key_for_event`].
pub fn decode_key_from_event(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;
    let mut result = Vec::with_capacity(encoded.len() * 5 / 8);

    for c in encoded.chars() {
        let val = if c.is_ascii() {
            DECODE_TABLE[c as usize]
        } else {
            0xFF
        };
        if val == 0xFF {
            return Err(CryptoError::InvalidCharacter(c));
        }
        buffer = (buffer << 5) | val as u64;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            result.push((buffer >> bits_in_buffer) as u8);
        }
    }

    // A full unused character means no byte string encodes to this length.
    if bits_in_buffer >= 5 {
        return Err(CryptoError::InvalidLength(encoded.len()));
    }
    if buffer & ((1u64 << bits_in_buffer) - 1) != 0 {
        return Err(CryptoError::NonCanonical);
    }

    Ok(result)
}
