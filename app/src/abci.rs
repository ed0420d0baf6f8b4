//! The contract between the consensus engine and the application.

use crate::app::{
    ShutterApp, STAT_CHECK_TX_ACCEPTED, STAT_CHECK_TX_REJECTED, STAT_COMMITS,
    STAT_DELIVER_TX_ACCEPTED, STAT_DELIVER_TX_REJECTED,
};
use crate::error::AppError;
use crate::events::Event;
use crate::validators::ValidatorUpdate;
use serde::{Deserialize, Serialize};
use shutter_types::GenesisAppState;
use tracing::debug;

/// Result code of an accepted transaction.
pub const CODE_OK: u32 = 0;

/// Chain start parameters from the consensus engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitChain {
    pub chain_id: String,
    /// JSON encoded [`GenesisAppState`].
    pub app_state: Vec<u8>,
    pub validators: Vec<ValidatorUpdate>,
}

/// Outcome of `check_tx` or `deliver_tx`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub code: u32,
    pub log: String,
    pub events: Vec<Event>,
}

impl TxResult {
    pub fn ok(events: Vec<Event>) -> Self {
        Self {
            code: CODE_OK,
            log: String::new(),
            events,
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self {
            code: err.code(),
            log: err.to_string(),
            events: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// What the application reports back at the end of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitResponse {
    pub app_hash: [u8; 32],
    pub height: u64,
    pub validator_updates: Vec<ValidatorUpdate>,
}

/// Callbacks the consensus engine drives, one block at a time.
pub trait Application {
    fn init_chain(&mut self, request: InitChain) -> Result<(), AppError>;

    /// Admission check ahead of block inclusion. Never changes replicated state.
    fn check_tx(&mut self, tx: &[u8]) -> TxResult;

    fn deliver_tx(&mut self, tx: &[u8]) -> TxResult;

    fn commit(&mut self) -> Result<CommitResponse, AppError>;
}

impl Application for ShutterApp {
    fn init_chain(&mut self, request: InitChain) -> Result<(), AppError> {
        let genesis = GenesisAppState::from_json(&request.app_state)?;
        self.apply_genesis(request.chain_id, &genesis, &request.validators)
    }

    fn check_tx(&mut self, tx: &[u8]) -> TxResult {
        match self.admit(tx) {
            Ok(()) => {
                self.stats.increment(STAT_CHECK_TX_ACCEPTED);
                TxResult::ok(Vec::new())
            }
            Err(err) => {
                self.stats.increment(STAT_CHECK_TX_REJECTED);
                debug!(code = err.code(), error = %err, "check_tx rejected");
                TxResult::from_error(&err)
            }
        }
    }

    fn deliver_tx(&mut self, tx: &[u8]) -> TxResult {
        match self.deliver(tx) {
            Ok(events) => {
                self.stats.increment(STAT_DELIVER_TX_ACCEPTED);
                TxResult::ok(events)
            }
            Err(err) => {
                self.stats.increment(STAT_DELIVER_TX_REJECTED);
                debug!(code = err.code(), error = %err, "deliver_tx rejected");
                TxResult::from_error(&err)
            }
        }
    }

    fn commit(&mut self) -> Result<CommitResponse, AppError> {
        let validator_updates = self.finish_block();
        let app_hash = self.app_hash()?;
        self.stats.increment(STAT_COMMITS);
        Ok(CommitResponse {
            app_hash,
            height: self.last_block_height(),
            validator_updates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_results_carry_code_and_log() {
        let result = TxResult::from_error(&AppError::InvalidSignature);
        assert_eq!(result.code, 2);
        assert_eq!(result.log, "invalid signature");
        assert!(!result.is_ok());
        assert!(TxResult::ok(Vec::new()).is_ok());
    }
}
