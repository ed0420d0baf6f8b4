use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid character {0:?} in event encoding")]
    InvalidCharacter(char),

    #[error("event encoding has invalid length {0}")]
    InvalidLength(usize),

    #[error("event encoding has non-zero padding bits")]
    NonCanonical,
}
