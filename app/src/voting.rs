//! Single-vote-per-keyper tallies for config changes and eon starts.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use shutter_types::{Address, BatchConfig};
use std::collections::BTreeMap;

/// Something keypers can vote on.
pub trait Candidate: Clone {
    /// Whether two proposals count as votes for the same candidate.
    fn matches(&self, other: &Self) -> bool;
}

impl Candidate for u64 {
    fn matches(&self, other: &Self) -> bool {
        self == other
    }
}

impl Candidate for BatchConfig {
    fn matches(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

/// Votes needed to adopt a candidate under `electorate`.
pub fn quorum(electorate: &BatchConfig) -> u64 {
    electorate.threshold.max(1)
}

/// One voting round.
///
/// Each keyper has at most one vote; voting again moves the vote to the new
/// candidate. The first candidate whose distinct-voter tally reaches the
/// quorum wins, in delivery order, and the round stays decided afterwards.
/// Only candidates that currently hold a vote are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voting<C> {
    votes: BTreeMap<Address, C>,
    outcome: Option<C>,
}

/// Voting on the next batch config.
pub type ConfigVoting = Voting<BatchConfig>;

/// Voting on the start batch index of the next eon.
pub type EonStartVoting = Voting<u64>;

impl<C> Default for Voting<C> {
    fn default() -> Self {
        Self {
            votes: BTreeMap::new(),
            outcome: None,
        }
    }
}

impl<C: Candidate> Voting<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voter`'s vote for `candidate`.
    ///
    /// Returns the winning candidate if this vote decided the round. Once the
    /// round is decided, votes are only recorded for candidates already on the
    /// table and never decide it again.
    pub fn vote(
        &mut self,
        voter: Address,
        candidate: C,
        electorate: &BatchConfig,
    ) -> Result<Option<C>, AppError> {
        if !electorate.is_keyper(&voter) {
            return Err(AppError::UnknownVoter(voter));
        }

        if self.outcome.is_some() {
            if self.is_known(&candidate) {
                self.votes.insert(voter, candidate);
            }
            return Ok(None);
        }

        self.votes.insert(voter, candidate.clone());
        if self.votes_for(&candidate) as u64 >= quorum(electorate) {
            self.outcome = Some(candidate.clone());
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    fn is_known(&self, candidate: &C) -> bool {
        self.outcome.as_ref().is_some_and(|c| c.matches(candidate))
            || self.votes.values().any(|c| c.matches(candidate))
    }

    /// Number of distinct keypers currently voting for a candidate matching `candidate`.
    pub fn votes_for(&self, candidate: &C) -> usize {
        self.votes.values().filter(|c| c.matches(candidate)).count()
    }

    pub fn vote_of(&self, voter: &Address) -> Option<&C> {
        self.votes.get(voter)
    }

    pub fn outcome(&self) -> Option<&C> {
        self.outcome.as_ref()
    }

    pub fn is_decided(&self) -> bool {
        self.outcome.is_some()
    }

    /// Distinct candidates holding at least one vote, in voter order.
    pub fn candidates(&self) -> Vec<&C> {
        let mut distinct: Vec<&C> = Vec::new();
        for candidate in self.votes.values() {
            if !distinct.iter().any(|c| c.matches(candidate)) {
                distinct.push(candidate);
            }
        }
        distinct
    }
}
