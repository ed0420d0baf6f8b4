//! Fundamental types for the shuttermint keyper application.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! keyper addresses, key material newtypes, batch configurations and the genesis
//! descriptor used to bootstrap the first configuration.

pub mod address;
pub mod config;
pub mod error;
pub mod genesis;
pub mod keys;

pub use address::Address;
pub use config::{BatchConfig, BatchState, DecryptionSignature};
pub use error::ShutterError;
pub use genesis::GenesisAppState;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature, ValidatorPubkey};
