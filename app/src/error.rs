use crate::dkg::DkgPhase;
use shutter_messages::MessageError;
use shutter_types::{Address, ShutterError};
use thiserror::Error;

/// Why a transaction (or an app-level call) was rejected.
///
/// Every variant maps to a stable nonzero result code, see [`AppError::code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    // Malformed or replayed input
    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("wrong chain id: expected {expected}, got {got}")]
    WrongChainId { expected: String, got: String },

    #[error("nonce {nonce} already used by {sender}")]
    NonceReused { sender: Address, nonce: u64 },

    #[error("{0} is not a keyper")]
    NotAMember(Address),

    #[error("{sender} exceeded {max} transactions in this block")]
    RateLimited { sender: Address, max: usize },

    // Configuration and voting
    #[error("config start batch index {got} must be greater than {last}")]
    InvalidConfigOrder { last: u64, got: u64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("expected config index {expected}, got {got}")]
    InvalidConfigIndex { expected: u64, got: u64 },

    #[error("unknown config index {0}")]
    UnknownConfig(u64),

    #[error("{0} is not a keyper of the active config")]
    UnknownVoter(Address),

    #[error("eon start batch index {start} must be at least {min}")]
    InvalidEonStart { start: u64, min: u64 },

    #[error("invalid validator key: {0}")]
    InvalidValidatorKey(String),

    // Threshold aggregation and DKG
    #[error("{0} is not a keyper of the governing config")]
    UnknownSender(Address),

    #[error("duplicate submission from {0}")]
    DuplicateSubmission(Address),

    #[error("unknown eon {0}")]
    UnknownEon(u64),

    #[error("eon {0} has no finalized key")]
    EonNotFinalized(u64),

    #[error("{kind} not accepted in phase {phase}")]
    WrongPhase { kind: String, phase: DkgPhase },

    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition { from: DkgPhase, to: DkgPhase },

    #[error("{0} did not deal in this eon")]
    UnknownAccused(Address),

    #[error("no open accusation by {accuser} against {accused}")]
    UnmatchedApology { accuser: Address, accused: Address },

    // Node level
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot store error: {0}")]
    Storage(String),
}

impl AppError {
    /// Result code reported to the consensus engine. 0 means success.
    pub fn code(&self) -> u32 {
        match self {
            Self::Malformed(_) => 1,
            Self::InvalidSignature => 2,
            Self::WrongChainId { .. } => 3,
            Self::NonceReused { .. } => 4,
            Self::NotAMember(_) => 5,
            Self::RateLimited { .. } => 6,
            Self::InvalidConfigOrder { .. } => 10,
            Self::InvalidConfig(_) => 11,
            Self::InvalidConfigIndex { .. } => 12,
            Self::UnknownConfig(_) => 13,
            Self::UnknownVoter(_) => 14,
            Self::InvalidEonStart { .. } => 15,
            Self::InvalidValidatorKey(_) => 16,
            Self::UnknownSender(_) => 20,
            Self::DuplicateSubmission(_) => 21,
            Self::UnknownEon(_) => 22,
            Self::EonNotFinalized(_) => 23,
            Self::WrongPhase { .. } => 24,
            Self::InvalidTransition { .. } => 25,
            Self::UnknownAccused(_) => 26,
            Self::UnmatchedApology { .. } => 27,
            Self::InvalidGenesis(_) => 30,
            Self::Config(_) => 31,
            Self::Serialization(_) => 32,
            Self::Storage(_) => 33,
        }
    }
}

impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::InvalidSignature(_) => Self::InvalidSignature,
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl From<ShutterError> for AppError {
    fn from(err: ShutterError) -> Self {
        match err {
            ShutterError::InvalidValidatorPubkey(_) => Self::InvalidValidatorKey(err.to_string()),
            ShutterError::InvalidAddress(_) | ShutterError::InvalidGenesis(_) => {
                Self::InvalidGenesis(err.to_string())
            }
            ShutterError::Serialization(e) => Self::Serialization(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_nonzero_and_distinct() {
        let addr = Address::ZERO;
        let errors = [
            AppError::Malformed(String::new()),
            AppError::InvalidSignature,
            AppError::WrongChainId { expected: "a".into(), got: "b".into() },
            AppError::NonceReused { sender: addr, nonce: 1 },
            AppError::NotAMember(addr),
            AppError::RateLimited { sender: addr, max: 1 },
            AppError::InvalidConfigOrder { last: 1, got: 1 },
            AppError::InvalidConfig(String::new()),
            AppError::InvalidConfigIndex { expected: 1, got: 2 },
            AppError::UnknownConfig(1),
            AppError::UnknownVoter(addr),
            AppError::InvalidEonStart { start: 0, min: 1 },
            AppError::InvalidValidatorKey(String::new()),
            AppError::UnknownSender(addr),
            AppError::DuplicateSubmission(addr),
            AppError::UnknownEon(1),
            AppError::EonNotFinalized(1),
            AppError::WrongPhase { kind: "x".into(), phase: DkgPhase::Dealing },
            AppError::InvalidTransition { from: DkgPhase::Accusing, to: DkgPhase::Dealing },
            AppError::UnknownAccused(addr),
            AppError::UnmatchedApology { accuser: addr, accused: addr },
            AppError::InvalidGenesis(String::new()),
            AppError::Config(String::new()),
            AppError::Serialization(String::new()),
            AppError::Storage(String::new()),
        ];
        let codes: std::collections::BTreeSet<u32> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn signature_errors_keep_their_code() {
        let err: AppError = MessageError::InvalidSignature("0xab".into()).into();
        assert_eq!(err, AppError::InvalidSignature);
        let err: AppError = MessageError::Malformed("eof".into()).into();
        assert_eq!(err.code(), 1);
    }
}
