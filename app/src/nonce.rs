//! Replay protection and per-block admission control.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use shutter_messages::MessageKind;
use shutter_types::Address;
use std::collections::{BTreeMap, BTreeSet};

/// Nonces used by each sender.
///
/// Grows for the lifetime of the chain. Checking never records; only
/// [`NonceTracker::mark_used`] does.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceTracker {
    used: BTreeMap<Address, BTreeSet<u64>>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, sender: &Address, nonce: u64) -> Result<(), AppError> {
        if self.is_used(sender, nonce) {
            return Err(AppError::NonceReused {
                sender: *sender,
                nonce,
            });
        }
        Ok(())
    }

    pub fn mark_used(&mut self, sender: Address, nonce: u64) {
        self.used.entry(sender).or_default().insert(nonce);
    }

    pub fn is_used(&self, sender: &Address, nonce: u64) -> bool {
        self.used
            .get(sender)
            .is_some_and(|nonces| nonces.contains(&nonce))
    }

    pub fn clear(&mut self) {
        self.used.clear();
    }
}

/// Ephemeral state consulted by `check_tx`. Reset at every commit.
#[derive(Clone, Debug, Default)]
pub struct CheckTxState {
    members: BTreeSet<Address>,
    tx_counts: BTreeMap<Address, usize>,
    seen: NonceTracker,
    max_txs_per_block: usize,
}

impl CheckTxState {
    pub fn new(members: BTreeSet<Address>, max_txs_per_block: usize) -> Self {
        Self {
            members,
            tx_counts: BTreeMap::new(),
            seen: NonceTracker::new(),
            max_txs_per_block,
        }
    }

    /// Count one more `kind` transaction from `sender` towards this block.
    pub fn admit_for_block(&mut self, sender: Address, kind: MessageKind) -> Result<(), AppError> {
        if !self.members.contains(&sender) {
            return Err(AppError::NotAMember(sender));
        }
        let count = self.tx_counts.get(&sender).copied().unwrap_or(0);
        if count >= self.max_txs_per_block {
            tracing::debug!(%sender, %kind, count, "admission ceiling reached");
            return Err(AppError::RateLimited {
                sender,
                max: self.max_txs_per_block,
            });
        }
        self.tx_counts.insert(sender, count + 1);
        Ok(())
    }

    /// Nonces already admitted since the last commit.
    pub fn seen(&self) -> &NonceTracker {
        &self.seen
    }

    pub fn mark_seen(&mut self, sender: Address, nonce: u64) {
        self.seen.mark_used(sender, nonce);
    }

    pub fn tx_count(&self, sender: &Address) -> usize {
        self.tx_counts.get(sender).copied().unwrap_or(0)
    }

    pub fn is_member(&self, sender: &Address) -> bool {
        self.members.contains(sender)
    }

    /// Start a new block with a fresh member set.
    pub fn reset(&mut self, members: BTreeSet<Address>) {
        self.members = members;
        self.tx_counts.clear();
        self.seen.clear();
    }
}
