//! Transaction codec: bincode with a hard size limit.

use crate::error::MessageError;
use crate::SignedMessage;
use bincode::Options;

/// Maximum encoded transaction size in bytes.
pub const MAX_TX_SIZE: usize = 64 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_TX_SIZE as u64)
}

/// Encode a signed transaction for submission to the consensus engine.
pub fn encode_tx(tx: &SignedMessage) -> Result<Vec<u8>, MessageError> {
    let bytes = options()
        .serialize(tx)
        .map_err(|e| MessageError::Malformed(e.to_string()))?;
    if bytes.len() > MAX_TX_SIZE {
        return Err(MessageError::TooLarge {
            size: bytes.len(),
            max: MAX_TX_SIZE,
        });
    }
    Ok(bytes)
}

/// Decode a transaction delivered by the consensus engine.
pub fn decode_tx(data: &[u8]) -> Result<SignedMessage, MessageError> {
    if data.len() > MAX_TX_SIZE {
        return Err(MessageError::TooLarge {
            size: data.len(),
            max: MAX_TX_SIZE,
        });
    }
    options()
        .deserialize(data)
        .map_err(|e| MessageError::Malformed(e.to_string()))
}
