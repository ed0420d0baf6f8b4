//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for shuttermint types.
#[derive(Debug, Error)]
pub enum ShutterError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("validator pubkey must be 32 bytes, got {0}")]
    InvalidValidatorPubkey(usize),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
