//! Accumulate-until-threshold aggregation of keyper submissions.

use serde::{Deserialize, Serialize};
use shutter_types::Address;
use std::collections::BTreeMap;

/// Collects public key commitments for one batch.
///
/// Every sender contributes one value; resubmissions are ignored. As soon as
/// one value has been submitted by `threshold` distinct senders it becomes
/// the agreed value, and the accumulator never finalizes again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentAccumulator {
    submissions: BTreeMap<Address, Vec<u8>>,
    finalized: Option<Vec<u8>>,
}

impl CommitmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sender`'s commitment.
    ///
    /// Returns the agreed value if this submission finalized the accumulator.
    pub fn submit(&mut self, sender: Address, value: Vec<u8>, threshold: u64) -> Option<Vec<u8>> {
        if self.submissions.contains_key(&sender) {
            return None;
        }
        self.submissions.insert(sender, value.clone());

        if self.finalized.is_some() {
            return None;
        }
        if self.count_matching(&value) as u64 >= threshold.max(1) {
            self.finalized = Some(value.clone());
            return Some(value);
        }
        None
    }

    pub fn count_matching(&self, value: &[u8]) -> usize {
        self.submissions
            .values()
            .filter(|v| v.as_slice() == value)
            .count()
    }

    pub fn submission(&self, sender: &Address) -> Option<&[u8]> {
        self.submissions.get(sender).map(Vec::as_slice)
    }

    pub fn finalized(&self) -> Option<&[u8]> {
        self.finalized.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}

/// Collects epoch secret key shares for one (eon, epoch).
///
/// Shares differ per sender, so finalization counts distinct senders rather
/// than matching values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAccumulator {
    shares: BTreeMap<Address, Vec<u8>>,
    finalized: bool,
}

impl ShareAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sender`'s share.
    ///
    /// Returns all shares, in sender order, if this submission reached the
    /// threshold. Returns `None` for resubmissions and after finalization.
    pub fn submit(
        &mut self,
        sender: Address,
        share: Vec<u8>,
        threshold: u64,
    ) -> Option<Vec<(Address, Vec<u8>)>> {
        if self.shares.contains_key(&sender) {
            return None;
        }
        self.shares.insert(sender, share);

        if self.finalized || (self.shares.len() as u64) < threshold.max(1) {
            return None;
        }
        self.finalized = true;
        Some(
            self.shares
                .iter()
                .map(|(sender, share)| (*sender, share.clone()))
                .collect(),
        )
    }

    pub fn share(&self, sender: &Address) -> Option<&[u8]> {
        self.shares.get(sender).map(Vec::as_slice)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}
