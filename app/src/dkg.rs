//! Per-eon distributed key generation.
//!
//! Keypers deal polynomial evaluations and commitments, accuse dealers whose
//! evaluations do not verify, and accused dealers may answer with an apology
//! revealing the evaluation. Dealers left with an unanswered accusation are
//! disqualified. Phase changes happen only on delivered transactions, either
//! because everyone has acted or because a deadline batch index was reached.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use shutter_types::{Address, BatchConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Phase of a [`DkgInstance`]. Only ever moves forward, one step at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DkgPhase {
    /// Collecting polynomial evaluations and commitments.
    Dealing,
    /// Collecting accusations against dealers.
    Accusing,
    /// Collecting apologies from accused dealers.
    Apologizing,
    /// Enough dealers qualified; the eon key exists.
    Finalized,
    /// Too few dealers qualified; the eon produced no key.
    Aborted,
}

impl DkgPhase {
    /// Whether `next` is the immediate successor of `self`.
    pub fn can_transition_to(self, next: DkgPhase) -> bool {
        matches!(
            (self, next),
            (Self::Dealing, Self::Accusing)
                | (Self::Accusing, Self::Apologizing)
                | (Self::Apologizing, Self::Finalized)
                | (Self::Apologizing, Self::Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dealing => "dealing",
            Self::Accusing => "accusing",
            Self::Apologizing => "apologizing",
            Self::Finalized => "finalized",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for DkgPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encrypted polynomial evaluations from one dealer, one per receiver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyEval {
    pub receivers: Vec<Address>,
    pub encrypted_evals: Vec<Vec<u8>>,
}

/// How an instance ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DkgOutcome {
    Finalized { qualified: Vec<Address> },
    Aborted { qualified: Vec<Address>, threshold: u64 },
}

/// Key generation state for one eon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgInstance {
    eon: u64,
    config: BatchConfig,
    start_batch_index: u64,
    phase_length: u64,
    phase: DkgPhase,

    poly_evals: BTreeMap<Address, PolyEval>,
    poly_commitments: BTreeMap<Address, Vec<Vec<u8>>>,
    /// (accuser, accused) -> evaluation claimed invalid.
    accusations: BTreeMap<(Address, Address), Vec<u8>>,
    /// (accuser, accused) -> evaluation revealed by the accused.
    apologies: BTreeMap<(Address, Address), Vec<u8>>,

    qualified: Vec<Address>,
}

impl DkgInstance {
    pub fn new(eon: u64, config: BatchConfig, start_batch_index: u64, phase_length: u64) -> Self {
        Self {
            eon,
            config,
            start_batch_index,
            phase_length,
            phase: DkgPhase::Dealing,
            poly_evals: BTreeMap::new(),
            poly_commitments: BTreeMap::new(),
            accusations: BTreeMap::new(),
            apologies: BTreeMap::new(),
            qualified: Vec::new(),
        }
    }

    pub fn eon(&self) -> u64 {
        self.eon
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn start_batch_index(&self) -> u64 {
        self.start_batch_index
    }

    pub fn phase(&self) -> DkgPhase {
        self.phase
    }

    pub fn submissions_closed(&self) -> bool {
        self.phase != DkgPhase::Dealing
    }

    pub fn accusations_closed(&self) -> bool {
        !matches!(self.phase, DkgPhase::Dealing | DkgPhase::Accusing)
    }

    pub fn apologies_closed(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn dealing_deadline(&self) -> u64 {
        self.start_batch_index.saturating_add(self.phase_length)
    }

    pub fn accusing_deadline(&self) -> u64 {
        self.start_batch_index
            .saturating_add(self.phase_length.saturating_mul(2))
    }

    pub fn apologizing_deadline(&self) -> u64 {
        self.start_batch_index
            .saturating_add(self.phase_length.saturating_mul(3))
    }

    /// Dealers that survived accusation. Empty until the instance is finalized.
    pub fn qualified(&self) -> &[Address] {
        &self.qualified
    }

    pub fn is_qualified(&self, address: &Address) -> bool {
        self.qualified.contains(address)
    }

    pub fn poly_commitment(&self, dealer: &Address) -> Option<&[Vec<u8>]> {
        self.poly_commitments.get(dealer).map(Vec::as_slice)
    }

    pub fn poly_eval(&self, dealer: &Address) -> Option<&PolyEval> {
        self.poly_evals.get(dealer)
    }

    pub fn accusation_count(&self) -> usize {
        self.accusations.len()
    }

    /// Accusations that have not been answered by an apology.
    pub fn open_accusations(&self) -> impl Iterator<Item = &(Address, Address)> + '_ {
        self.accusations
            .keys()
            .filter(move |key| !self.apologies.contains_key(*key))
    }

    /// Move to `next`, which must directly follow the current phase.
    pub fn transition(&mut self, next: DkgPhase) -> Result<(), AppError> {
        if !self.phase.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    fn require_phase(&self, expected: DkgPhase, kind: &str) -> Result<(), AppError> {
        if self.phase != expected {
            return Err(AppError::WrongPhase {
                kind: kind.to_string(),
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn require_keyper(&self, sender: &Address) -> Result<(), AppError> {
        if !self.config.is_keyper(sender) {
            return Err(AppError::UnknownSender(*sender));
        }
        Ok(())
    }

    pub fn submit_poly_eval(&mut self, sender: Address, eval: PolyEval) -> Result<(), AppError> {
        self.require_phase(DkgPhase::Dealing, "poly-eval")?;
        self.require_keyper(&sender)?;
        if eval.receivers.len() != eval.encrypted_evals.len() {
            return Err(AppError::Malformed(format!(
                "{} receivers but {} evaluations",
                eval.receivers.len(),
                eval.encrypted_evals.len()
            )));
        }
        let mut seen = BTreeSet::new();
        for receiver in &eval.receivers {
            if !self.config.is_keyper(receiver) {
                return Err(AppError::Malformed(format!("receiver {receiver} is not a keyper")));
            }
            if !seen.insert(receiver) {
                return Err(AppError::Malformed(format!("receiver {receiver} listed twice")));
            }
        }
        if self.poly_evals.contains_key(&sender) {
            return Err(AppError::DuplicateSubmission(sender));
        }

        self.poly_evals.insert(sender, eval);
        self.close_dealing_if_complete()
    }

    pub fn submit_poly_commitment(
        &mut self,
        sender: Address,
        gammas: Vec<Vec<u8>>,
    ) -> Result<(), AppError> {
        self.require_phase(DkgPhase::Dealing, "poly-commitment")?;
        self.require_keyper(&sender)?;
        if gammas.is_empty() {
            return Err(AppError::Malformed("empty polynomial commitment".into()));
        }
        if self.poly_commitments.contains_key(&sender) {
            return Err(AppError::DuplicateSubmission(sender));
        }

        self.poly_commitments.insert(sender, gammas);
        self.close_dealing_if_complete()
    }

    fn close_dealing_if_complete(&mut self) -> Result<(), AppError> {
        let all_dealt = self
            .config
            .keypers
            .iter()
            .all(|k| self.poly_evals.contains_key(k) && self.poly_commitments.contains_key(k));
        if all_dealt {
            self.transition(DkgPhase::Accusing)?;
        }
        Ok(())
    }

    pub fn submit_accusation(
        &mut self,
        sender: Address,
        accused: Address,
        evaluation: Vec<u8>,
    ) -> Result<(), AppError> {
        self.require_phase(DkgPhase::Accusing, "accusation")?;
        self.require_keyper(&sender)?;
        if sender == accused {
            return Err(AppError::Malformed("keyper accused itself".into()));
        }
        if !self.poly_commitments.contains_key(&accused) {
            return Err(AppError::UnknownAccused(accused));
        }
        if self.accusations.contains_key(&(sender, accused)) {
            return Err(AppError::DuplicateSubmission(sender));
        }

        self.accusations.insert((sender, accused), evaluation);
        Ok(())
    }

    /// Answer `accuser`'s accusation against `sender`.
    ///
    /// Finalizes the instance once no accusation is left open.
    pub fn submit_apology(
        &mut self,
        sender: Address,
        accuser: Address,
        evaluation: Vec<u8>,
    ) -> Result<Option<DkgOutcome>, AppError> {
        self.require_phase(DkgPhase::Apologizing, "apology")?;
        self.require_keyper(&sender)?;
        let key = (accuser, sender);
        if !self.accusations.contains_key(&key) {
            return Err(AppError::UnmatchedApology {
                accuser,
                accused: sender,
            });
        }
        if self.apologies.contains_key(&key) {
            return Err(AppError::DuplicateSubmission(sender));
        }

        self.apologies.insert(key, evaluation);
        if self.open_accusations().next().is_none() {
            return self.finalize().map(Some);
        }
        Ok(None)
    }

    /// Apply every deadline reached by `batch_index`.
    ///
    /// Returns the outcome if this call ended the instance.
    pub fn advance_to(&mut self, batch_index: u64) -> Result<Option<DkgOutcome>, AppError> {
        if self.phase == DkgPhase::Dealing && batch_index >= self.dealing_deadline() {
            self.transition(DkgPhase::Accusing)?;
        }
        if self.phase == DkgPhase::Accusing && batch_index >= self.accusing_deadline() {
            self.transition(DkgPhase::Apologizing)?;
        }
        if self.phase == DkgPhase::Apologizing
            && (batch_index >= self.apologizing_deadline() || self.open_accusations().next().is_none())
        {
            return self.finalize().map(Some);
        }
        Ok(None)
    }

    fn finalize(&mut self) -> Result<DkgOutcome, AppError> {
        let disqualified: BTreeSet<Address> =
            self.open_accusations().map(|(_, accused)| *accused).collect();
        let qualified: Vec<Address> = self
            .config
            .keypers
            .iter()
            .filter(|k| self.poly_commitments.contains_key(*k) && !disqualified.contains(*k))
            .copied()
            .collect();

        let threshold = self.config.threshold;
        if (qualified.len() as u64) < threshold.max(1) {
            self.transition(DkgPhase::Aborted)?;
            self.qualified = qualified.clone();
            return Ok(DkgOutcome::Aborted { qualified, threshold });
        }
        self.transition(DkgPhase::Finalized)?;
        self.qualified = qualified.clone();
        Ok(DkgOutcome::Finalized { qualified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn instance(n: u8, threshold: u64) -> DkgInstance {
        let config = BatchConfig {
            keypers: (1..=n).map(addr).collect(),
            threshold,
            start_batch_index: 1,
            config_index: 1,
            ..Default::default()
        };
        DkgInstance::new(1, config, 100, 10)
    }

    fn eval_for(n: u8) -> PolyEval {
        PolyEval {
            receivers: (1..=n).map(addr).collect(),
            encrypted_evals: (1..=n).map(|b| vec![b]).collect(),
        }
    }

    fn deal_all(dkg: &mut DkgInstance, n: u8) {
        for k in 1..=n {
            dkg.submit_poly_eval(addr(k), eval_for(n)).unwrap();
            dkg.submit_poly_commitment(addr(k), vec![vec![k]]).unwrap();
        }
    }

    #[test]
    fn transitions_only_move_forward() {
        use DkgPhase::*;
        assert!(Dealing.can_transition_to(Accusing));
        assert!(Apologizing.can_transition_to(Aborted));
        assert!(!Dealing.can_transition_to(Apologizing));
        assert!(!Accusing.can_transition_to(Dealing));
        assert!(!Finalized.can_transition_to(Aborted));

        let mut dkg = instance(3, 2);
        let err = dkg.transition(Apologizing).unwrap_err();
        assert_eq!(err, AppError::InvalidTransition { from: Dealing, to: Apologizing });
        assert_eq!(dkg.phase(), Dealing);
    }

    #[test]
    fn dealing_closes_once_everyone_dealt() {
        let mut dkg = instance(3, 2);
        deal_all(&mut dkg, 2);
        assert_eq!(dkg.phase(), DkgPhase::Dealing);
        dkg.submit_poly_eval(addr(3), eval_for(3)).unwrap();
        assert!(!dkg.submissions_closed());
        dkg.submit_poly_commitment(addr(3), vec![vec![3]]).unwrap();
        assert!(dkg.submissions_closed());
        assert_eq!(dkg.phase(), DkgPhase::Accusing);
    }

    #[test]
    fn duplicate_and_foreign_submissions_rejected() {
        let mut dkg = instance(3, 2);
        dkg.submit_poly_commitment(addr(1), vec![vec![1]]).unwrap();
        assert_eq!(
            dkg.submit_poly_commitment(addr(1), vec![vec![9]]).unwrap_err(),
            AppError::DuplicateSubmission(addr(1))
        );
        assert_eq!(dkg.poly_commitment(&addr(1)), Some(&[vec![1u8]][..]));
        assert_eq!(
            dkg.submit_poly_commitment(addr(7), vec![vec![7]]).unwrap_err(),
            AppError::UnknownSender(addr(7))
        );
        assert!(matches!(
            dkg.submit_poly_commitment(addr(2), vec![]),
            Err(AppError::Malformed(_))
        ));
    }

    #[test]
    fn malformed_evals_rejected() {
        let mut dkg = instance(3, 2);
        let mut short = eval_for(3);
        short.encrypted_evals.pop();
        assert!(matches!(dkg.submit_poly_eval(addr(1), short), Err(AppError::Malformed(_))));

        let mut stranger = eval_for(3);
        stranger.receivers[0] = addr(9);
        assert!(matches!(dkg.submit_poly_eval(addr(1), stranger), Err(AppError::Malformed(_))));
        assert!(dkg.poly_eval(&addr(1)).is_none());
    }

    #[test]
    fn phase_gating() {
        let mut dkg = instance(3, 2);
        assert!(matches!(
            dkg.submit_accusation(addr(1), addr(2), vec![]),
            Err(AppError::WrongPhase { phase: DkgPhase::Dealing, .. })
        ));
        deal_all(&mut dkg, 3);
        assert!(matches!(
            dkg.submit_poly_eval(addr(1), eval_for(3)),
            Err(AppError::WrongPhase { phase: DkgPhase::Accusing, .. })
        ));
        assert!(matches!(
            dkg.submit_apology(addr(2), addr(1), vec![]),
            Err(AppError::WrongPhase { .. })
        ));
    }

    #[test]
    fn accusation_rules() {
        let mut dkg = instance(3, 2);
        dkg.submit_poly_commitment(addr(1), vec![vec![1]]).unwrap();
        dkg.submit_poly_commitment(addr(2), vec![vec![2]]).unwrap();
        assert_eq!(dkg.advance_to(110).unwrap(), None);
        assert_eq!(dkg.phase(), DkgPhase::Accusing);

        assert_eq!(
            dkg.submit_accusation(addr(1), addr(3), vec![]).unwrap_err(),
            AppError::UnknownAccused(addr(3))
        );
        assert!(matches!(
            dkg.submit_accusation(addr(1), addr(1), vec![]),
            Err(AppError::Malformed(_))
        ));
        dkg.submit_accusation(addr(1), addr(2), vec![5]).unwrap();
        dkg.submit_accusation(addr(3), addr(2), vec![5]).unwrap();
        assert_eq!(
            dkg.submit_accusation(addr(1), addr(2), vec![6]).unwrap_err(),
            AppError::DuplicateSubmission(addr(1))
        );
        assert_eq!(dkg.accusation_count(), 2);
    }

    #[test]
    fn apologies_clear_accusations() {
        let mut dkg = instance(3, 2);
        deal_all(&mut dkg, 3);
        dkg.submit_accusation(addr(1), addr(2), vec![5]).unwrap();
        assert_eq!(dkg.advance_to(120).unwrap(), None);
        assert_eq!(dkg.phase(), DkgPhase::Apologizing);

        assert_eq!(
            dkg.submit_apology(addr(3), addr(1), vec![]).unwrap_err(),
            AppError::UnmatchedApology { accuser: addr(1), accused: addr(3) }
        );
        let outcome = dkg.submit_apology(addr(2), addr(1), vec![5]).unwrap();
        assert_eq!(
            outcome,
            Some(DkgOutcome::Finalized { qualified: vec![addr(1), addr(2), addr(3)] })
        );
        assert!(dkg.apologies_closed());
        assert!(dkg.is_qualified(&addr(2)));
    }

    #[test]
    fn unanswered_accusation_disqualifies() {
        let mut dkg = instance(3, 2);
        deal_all(&mut dkg, 3);
        dkg.submit_accusation(addr(1), addr(3), vec![]).unwrap();
        assert_eq!(dkg.advance_to(120).unwrap(), None);
        assert_eq!(dkg.advance_to(129).unwrap(), None);
        let outcome = dkg.advance_to(130).unwrap();
        assert_eq!(
            outcome,
            Some(DkgOutcome::Finalized { qualified: vec![addr(1), addr(2)] })
        );
        assert!(!dkg.is_qualified(&addr(3)));
        // Terminal: further deadlines change nothing.
        assert_eq!(dkg.advance_to(1_000).unwrap(), None);
    }

    #[test]
    fn too_few_qualified_aborts() {
        let mut dkg = instance(3, 2);
        dkg.submit_poly_commitment(addr(1), vec![vec![1]]).unwrap();
        let outcome = dkg.advance_to(500).unwrap();
        assert_eq!(
            outcome,
            Some(DkgOutcome::Aborted { qualified: vec![addr(1)], threshold: 2 })
        );
        assert_eq!(dkg.phase(), DkgPhase::Aborted);
    }

    #[test]
    fn no_accusations_finalizes_when_accusing_ends() {
        let mut dkg = instance(2, 2);
        deal_all(&mut dkg, 2);
        assert_eq!(dkg.advance_to(119).unwrap(), None);
        assert!(matches!(
            dkg.advance_to(120).unwrap(),
            Some(DkgOutcome::Finalized { .. })
        ));
    }
}
