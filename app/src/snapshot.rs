//! Serialized snapshots of the replicated state.

use crate::app::{AppState, ShutterApp};
use crate::config::AppConfig;
use crate::error::AppError;
use shutter_crypto::blake2b_256;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Somewhere to keep state snapshots, keyed by block height.
pub trait SnapshotStore {
    fn save(&self, height: u64, snapshot: &[u8]) -> Result<(), AppError>;

    /// The snapshot with the greatest height, if any.
    fn load_latest(&self) -> Result<Option<(u64, Vec<u8>)>, AppError>;
}

/// In-memory snapshot store for tests and tooling.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<u64, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, height: u64, snapshot: &[u8]) -> Result<(), AppError> {
        self.snapshots
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))?
            .insert(height, snapshot.to_vec());
        Ok(())
    }

    fn load_latest(&self) -> Result<Option<(u64, Vec<u8>)>, AppError> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(snapshots
            .iter()
            .next_back()
            .map(|(height, bytes)| (*height, bytes.clone())))
    }
}

impl ShutterApp {
    /// Bincode encoding of the replicated state.
    pub fn snapshot(&self) -> Result<Vec<u8>, AppError> {
        bincode::serialize(&self.state).map_err(|e| AppError::Serialization(e.to_string()))
    }

    /// Blake2b-256 over [`ShutterApp::snapshot`].
    pub fn app_hash(&self) -> Result<[u8; 32], AppError> {
        Ok(blake2b_256(&self.snapshot()?))
    }

    /// Rebuild an application from a snapshot. Admission state starts empty.
    pub fn restore(snapshot: &[u8], config: AppConfig) -> Result<Self, AppError> {
        let state: AppState =
            bincode::deserialize(snapshot).map_err(|e| AppError::Serialization(e.to_string()))?;
        if state.params != config.consensus_params() {
            tracing::warn!("local config disagrees with snapshot consensus params, using snapshot");
        }
        Ok(Self::with_state(state, config))
    }

    pub fn persist(&self, store: &impl SnapshotStore) -> Result<(), AppError> {
        store.save(self.last_block_height(), &self.snapshot()?)
    }

    /// Restore from the latest snapshot in `store`, if there is one.
    pub fn load(store: &impl SnapshotStore, config: AppConfig) -> Result<Option<Self>, AppError> {
        match store.load_latest()? {
            Some((height, bytes)) => {
                let app = Self::restore(&bytes, config)?;
                tracing::info!(height, "restored application state");
                Ok(Some(app))
            }
            None => Ok(None),
        }
    }
}
