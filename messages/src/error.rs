use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("transaction too large: {size} > {max}")]
    TooLarge { size: usize, max: usize },

    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("invalid signature from {0}")]
    InvalidSignature(String),
}
