use num_bigint::BigUint;
use tracing::debug;

use crate::ledger::{VoteOutcome, Ballots};
use crate::types::{Address, OnchainProposal, Proposal, ProposalStatus, VoteChoice};

/// One proposal observation from any source (backend row, chain event,
/// contract read). Absent fields leave the stored entry untouched.
#[derive(Debug, Clone, Default)]
pub struct ProposalObservation {
    pub onchain_id: Option<u64>,
    pub creator: Option<Address>,
    pub description: Option<String>,
    pub executed: Option<bool>,
    pub finalized: Option<bool>,
    pub executor: Option<Address>,
    pub votes_for: Option<BigUint>,
    pub votes_against: Option<BigUint>,
    pub created_at: Option<i64>,
}

/// How an observation was resolved against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Exact match on the on-chain id.
    MatchedId,
    /// An optimistic Pending entry was bridged to its confirmed identity.
    BridgedPending,
    /// No match; a new entry was prepended.
    Inserted,
}

/// In-memory proposal collection, ordered newest-first.
///
/// The store is process-local and rebuilt each session from the backend; the
/// reconciliation engine is its sole writer. Entries are never deleted except
/// for an optimistic Pending entry whose transaction failed to confirm.
#[derive(Debug, Default)]
pub struct ProposalStore {
    entries: Vec<Proposal>,
    local_seq: u64,
}

impl ProposalStore {
    pub fn new() -> Self {
        ProposalStore::default()
    }

    /// Insert an optimistic Pending proposal at the front and return its
    /// local key.
    pub fn insert_pending(&mut self, description: &str, creator: Address) -> String {
        self.local_seq += 1;
        let key = format!("local-{}", self.local_seq);
        self.entries
            .insert(0, Proposal::new_pending(key.clone(), description, creator));
        key
    }

    /// Roll back an optimistic entry after a failed submission. Only Pending
    /// entries can be removed; a confirmed proposal lives for the session.
    pub fn remove_pending(&mut self, local_key: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|p| !(p.status == ProposalStatus::Pending && p.local_key == local_key));
        self.entries.len() != before
    }

    pub fn get_by_id(&self, id: u64) -> Option<&Proposal> {
        self.entries.iter().find(|p| p.id == Some(id))
    }

    fn get_mut_by_id(&mut self, id: u64) -> Option<&mut Proposal> {
        self.entries.iter_mut().find(|p| p.id == Some(id))
    }

    pub fn get_by_key(&self, key: &str) -> Option<&Proposal> {
        self.entries.iter().find(|p| p.local_key == key)
    }

    /// First entry created by `creator` with exactly this trimmed
    /// description. Used by the create orchestrator to re-locate its
    /// proposal after the optimistic key has been replaced by the real id.
    pub fn find_match(&self, creator: &Address, description: &str) -> Option<&Proposal> {
        let description = description.trim();
        self.entries
            .iter()
            .find(|p| &p.creator == creator && p.description == description)
    }

    /// Resolve an observation to an existing entry or insert a new one.
    ///
    /// Match order: exact on-chain id, then an optimistic Pending entry with
    /// the same creator and trimmed description (the optimistic-to-confirmed
    /// bridge), else prepend. On a match the entry is updated in place and
    /// its local key is replaced by the on-chain id so every later
    /// observation lands on a stable key.
    pub fn resolve(&mut self, obs: ProposalObservation) -> Resolution {
        if let Some(id) = obs.onchain_id {
            if let Some(idx) = self.entries.iter().position(|p| p.id == Some(id)) {
                Self::merge(&mut self.entries[idx], &obs);
                return Resolution::MatchedId;
            }

            if let (Some(creator), Some(description)) = (&obs.creator, &obs.description) {
                let description = description.trim();
                if let Some(idx) = self.entries.iter().position(|p| {
                    p.status == ProposalStatus::Pending
                        && &p.creator == creator
                        && p.description == description
                }) {
                    debug!(id, "bridging optimistic proposal to confirmed identity");
                    Self::merge(&mut self.entries[idx], &obs);
                    return Resolution::BridgedPending;
                }
            }
        }

        let key = match obs.onchain_id {
            Some(id) => id.to_string(),
            None => {
                self.local_seq += 1;
                format!("local-{}", self.local_seq)
            }
        };
        let mut entry = Proposal::new_pending(
            key,
            obs.description.as_deref().unwrap_or(""),
            obs.creator.clone().unwrap_or_else(|| Address::new("")),
        );
        Self::merge(&mut entry, &obs);
        self.entries.insert(0, entry);
        Resolution::Inserted
    }

    fn merge(entry: &mut Proposal, obs: &ProposalObservation) {
        if let Some(id) = obs.onchain_id {
            entry.id = Some(id);
            entry.local_key = id.to_string();
            entry.advance_status(ProposalStatus::Confirmed);
        }
        if let Some(creator) = &obs.creator {
            entry.creator = creator.clone();
        }
        if let Some(description) = &obs.description {
            entry.description = description.trim().to_string();
        }
        if let Some(created_at) = obs.created_at {
            entry.created_at = Some(created_at);
        }
        if let Some(executor) = &obs.executor {
            entry.executor = Some(executor.clone());
        }
        if obs.finalized == Some(true) {
            entry.advance_status(ProposalStatus::Finalized);
        }
        if obs.executed == Some(true) {
            entry.advance_status(ProposalStatus::Executed);
        }
        if obs.votes_for.is_some() || obs.votes_against.is_some() {
            let for_weight = obs
                .votes_for
                .clone()
                .unwrap_or_else(|| entry.ballots.for_weight().clone());
            let against_weight = obs
                .votes_against
                .clone()
                .unwrap_or_else(|| entry.ballots.against_weight().clone());
            entry.ballots.checkpoint(for_weight, against_weight);
        }
    }

    /// Apply an authoritative contract read. This is a checkpoint write: the
    /// chain's tallies, flags and timestamp replace whatever events or
    /// backend rows accumulated locally.
    pub fn checkpoint(&mut self, snap: &OnchainProposal) {
        if let Some(entry) = self.get_mut_by_id(snap.id) {
            entry.description = snap.description.trim().to_string();
            entry.created_at = Some(snap.created_at);
            entry
                .ballots
                .checkpoint(snap.votes_for.clone(), snap.votes_against.clone());
            if snap.executed {
                entry.advance_status(ProposalStatus::Executed);
            }
            return;
        }

        debug!(id = snap.id, "chain read for unknown proposal; inserting");
        self.resolve(ProposalObservation {
            onchain_id: Some(snap.id),
            description: Some(snap.description.clone()),
            executed: Some(snap.executed),
            votes_for: Some(snap.votes_for.clone()),
            votes_against: Some(snap.votes_against.clone()),
            created_at: Some(snap.created_at),
            ..Default::default()
        });
    }

    /// Record a vote event against a confirmed entry. Returns `None` when
    /// the proposal is not in the store yet.
    pub fn record_vote(
        &mut self,
        id: u64,
        voter: Address,
        choice: VoteChoice,
        weight: BigUint,
    ) -> Option<VoteOutcome> {
        self.get_mut_by_id(id)
            .map(|p| p.ballots.record(voter, choice, weight))
    }

    /// Register a voter whose weight is already covered by a checkpoint.
    pub fn note_voter(&mut self, id: u64, voter: Address, choice: VoteChoice) {
        if let Some(p) = self.get_mut_by_id(id) {
            p.ballots.note(voter, choice);
        }
    }

    pub fn mark_executed(&mut self, id: u64, executor: Option<Address>) {
        if let Some(p) = self.get_mut_by_id(id) {
            if let Some(executor) = executor {
                p.executor = Some(executor);
            }
            p.advance_status(ProposalStatus::Executed);
        }
    }

    pub fn mark_finalized(&mut self, id: u64) {
        if let Some(p) = self.get_mut_by_id(id) {
            p.advance_status(ProposalStatus::Finalized);
        }
    }

    /// Clone of the current view, newest-first. Readers never observe a
    /// partially applied merge because every mutation happens under one
    /// synchronous borrow.
    pub fn snapshot(&self) -> Vec<Proposal> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ballots(&self, id: u64) -> Option<&Ballots> {
        self.get_by_id(id).map(|p| &p.ballots)
    }
}
