//! Projection of keyper identities onto the consensus engine's validator set.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use shutter_types::{Address, BatchConfig, ValidatorPubkey};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Voting power per validator key.
pub type Powermap = BTreeMap<ValidatorPubkey, i64>;

/// A change to one validator's voting power. Power 0 removes the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub pubkey: ValidatorPubkey,
    pub power: i64,
}

/// Updates turning `old` into `new`: removed keys get power 0, added or
/// changed keys get their new power. Unchanged keys are omitted.
pub fn diff_powermaps(old: &Powermap, new: &Powermap) -> Vec<ValidatorUpdate> {
    let removed = old
        .keys()
        .filter(|pubkey| !new.contains_key(*pubkey))
        .map(|pubkey| ValidatorUpdate {
            pubkey: *pubkey,
            power: 0,
        });
    let changed = new
        .iter()
        .filter(|(pubkey, power)| old.get(*pubkey) != Some(*power))
        .map(|(pubkey, power)| ValidatorUpdate {
            pubkey: *pubkey,
            power: *power,
        });

    let mut updates: Vec<ValidatorUpdate> = removed.chain(changed).collect();
    updates.sort_by_key(|u| u.pubkey);
    updates
}

/// Validator identities and power, plus the updates owed to the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSync {
    /// Keys registered via check-in, not yet bound to a started config.
    check_ins: BTreeMap<Address, ValidatorPubkey>,
    /// Keys of keypers whose config has started.
    identities: BTreeMap<Address, ValidatorPubkey>,
    powermap: Powermap,
    /// Updates produced since the last commit, merged per key.
    pending: BTreeMap<ValidatorPubkey, i64>,
}

impl ValidatorSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the engine's genesis validator set as the current power map.
    pub fn set_initial(&mut self, validators: &[ValidatorUpdate]) {
        self.powermap = validators
            .iter()
            .filter(|v| v.power > 0)
            .map(|v| (v.pubkey, v.power))
            .collect();
    }

    /// Register `pubkey` as `sender`'s validator key, replacing an earlier one.
    pub fn check_in(&mut self, sender: Address, pubkey: ValidatorPubkey) -> Result<(), AppError> {
        let taken = self
            .check_ins
            .iter()
            .chain(self.identities.iter())
            .any(|(owner, key)| *key == pubkey && *owner != sender);
        if taken {
            return Err(AppError::InvalidValidatorKey(format!(
                "{pubkey} is registered by another keyper"
            )));
        }
        self.check_ins.insert(sender, pubkey);
        Ok(())
    }

    /// Rebuild the power map from the keypers of a config that just started.
    ///
    /// Keypers without a check-in are left out. If nobody checked in, the
    /// current set is kept and `None` is returned.
    pub fn activate(&mut self, config: &BatchConfig, power: i64) -> Option<Vec<ValidatorUpdate>> {
        let mut next = Powermap::new();
        for keyper in &config.keypers {
            match self.check_ins.get(keyper) {
                Some(pubkey) => {
                    self.identities.insert(*keyper, *pubkey);
                    next.insert(*pubkey, power);
                }
                None => warn!(%keyper, config_index = config.config_index, "keyper has not checked in"),
            }
        }
        if next.is_empty() {
            warn!(
                config_index = config.config_index,
                "no validator keys for started config, keeping current validators"
            );
            return None;
        }

        let updates = diff_powermaps(&self.powermap, &next);
        info!(
            config_index = config.config_index,
            validators = next.len(),
            updates = updates.len(),
            "validator set changed"
        );
        for update in &updates {
            self.pending.insert(update.pubkey, update.power);
        }
        self.powermap = next;
        Some(updates)
    }

    /// Hand over the updates accumulated since the last commit.
    pub fn drain_pending(&mut self) -> Vec<ValidatorUpdate> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(pubkey, power)| ValidatorUpdate { pubkey, power })
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn powermap(&self) -> &Powermap {
        &self.powermap
    }

    pub fn identity(&self, keyper: &Address) -> Option<&ValidatorPubkey> {
        self.identities.get(keyper)
    }

    pub fn checked_in(&self, keyper: &Address) -> Option<&ValidatorPubkey> {
        self.check_ins.get(keyper)
    }
}
