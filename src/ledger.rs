use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::types::{Address, VoteChoice};

/// Outcome of recording a vote observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First observation for this voter; tallies updated.
    Applied,
    /// Voter already has a recorded choice; tallies untouched. Event sources
    /// may redeliver, so this is the normal duplicate path.
    Ignored,
}

/// Per-proposal vote ledger: one choice per normalized address, with
/// weighted for/against tallies.
///
/// Tallies accumulate from event observations and are replaced wholesale
/// when an authoritative chain read arrives (`checkpoint`); the voter map
/// survives checkpoints since it is what enforces single-vote dedup.
#[derive(Debug, Clone, Default)]
pub struct Ballots {
    voters: HashMap<Address, VoteChoice>,
    for_weight: BigUint,
    against_weight: BigUint,
}

impl Ballots {
    pub fn new() -> Self {
        Ballots::default()
    }

    /// Record a vote observation. Duplicate observations for the same voter
    /// are ignored, which makes ingestion idempotent under redelivery.
    pub fn record(&mut self, voter: Address, choice: VoteChoice, weight: BigUint) -> VoteOutcome {
        if self.voters.contains_key(&voter) {
            return VoteOutcome::Ignored;
        }
        self.voters.insert(voter, choice);
        match choice {
            VoteChoice::For => self.for_weight += weight,
            VoteChoice::Against => self.against_weight += weight,
        }
        VoteOutcome::Applied
    }

    /// Register a voter without touching tallies. Used when the voter's
    /// weight is already reflected in a checkpointed tally, so that a later
    /// redelivered event for the same voter is still deduplicated.
    pub fn note(&mut self, voter: Address, choice: VoteChoice) {
        self.voters.entry(voter).or_insert(choice);
    }

    /// Replace both tallies with an authoritative chain-read snapshot. Never
    /// additive: the chain value is a consistency checkpoint.
    pub fn checkpoint(&mut self, for_weight: BigUint, against_weight: BigUint) {
        self.for_weight = for_weight;
        self.against_weight = against_weight;
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains_key(voter)
    }

    pub fn choice_of(&self, voter: &Address) -> Option<VoteChoice> {
        self.voters.get(voter).copied()
    }

    pub fn for_weight(&self) -> &BigUint {
        &self.for_weight
    }

    pub fn against_weight(&self) -> &BigUint {
        &self.against_weight
    }

    pub fn total(&self) -> BigUint {
        &self.for_weight + &self.against_weight
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty() && self.for_weight.is_zero() && self.against_weight.is_zero()
    }
}
