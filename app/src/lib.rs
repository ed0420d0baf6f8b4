//! Shuttermint application state machine.
//!
//! Keypers submit signed transactions that vote on batch configs, run the
//! per-eon distributed key generation and agree on eon public keys and epoch
//! secret key shares. [`ShutterApp`] owns the replicated state and implements
//! [`Application`], the contract the consensus engine drives.

pub mod abci;
pub mod aggregation;
pub mod app;
pub mod config;
pub mod dkg;
pub mod error;
pub mod events;
pub mod nonce;
pub mod registry;
pub mod snapshot;
pub mod validators;
pub mod voting;

pub use abci::{Application, CommitResponse, InitChain, TxResult, CODE_OK};
pub use aggregation::{CommitmentAccumulator, ShareAccumulator};
pub use app::{AppState, ShutterApp};
pub use config::{AppConfig, ConsensusParams};
pub use dkg::{DkgInstance, DkgOutcome, DkgPhase, PolyEval};
pub use error::AppError;
pub use events::{Event, EventAttribute};
pub use nonce::{CheckTxState, NonceTracker};
pub use registry::ConfigRegistry;
pub use snapshot::{MemorySnapshotStore, SnapshotStore};
pub use validators::{diff_powermaps, Powermap, ValidatorSync, ValidatorUpdate};
pub use voting::{ConfigVoting, EonStartVoting, Voting};
