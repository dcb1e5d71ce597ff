use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::join_all;
use num_bigint::BigUint;
use num_traits::One;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::GovernanceError;
use crate::ledger::VoteOutcome;
use crate::sources::{BackendReader, ChainReader, ProposalDto, ResultsDto};
use crate::store::{ProposalObservation, ProposalStore};
use crate::types::{Address, ChainEvent, Proposal, VoteChoice};

/// Merges the three proposal sources (backend rows, chain events, direct
/// contract reads) into the proposal record store.
///
/// The engine is the store's sole writer. Every merge happens under one
/// synchronous lock acquisition with no suspension point inside, so readers
/// always observe a complete merge. Stale responses are discarded with
/// generation counters: the backend list sync and each proposal's chain
/// re-read carry a generation token taken at request time, and a result is
/// only merged if its token is still current when it arrives.
pub struct ReconciliationEngine {
    store: Arc<RwLock<ProposalStore>>,
    backend: Arc<dyn BackendReader>,
    chain: Arc<dyn ChainReader>,
    sync_gen: AtomicU64,
    reread_gen: Mutex<HashMap<u64, u64>>,
}

impl ReconciliationEngine {
    pub fn new(backend: Arc<dyn BackendReader>, chain: Arc<dyn ChainReader>) -> Self {
        ReconciliationEngine {
            store: Arc::new(RwLock::new(ProposalStore::new())),
            backend,
            chain,
            sync_gen: AtomicU64::new(0),
            reread_gen: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the full proposal list from the backend and resolve every row
    /// into the store, then issue a targeted chain re-read per confirmed id
    /// to correct any staleness in the backend's tallies.
    ///
    /// Returns the number of rows resolved. A transport failure surfaces to
    /// the caller as retryable and leaves previously resolved state intact;
    /// individual re-read failures are logged and skipped.
    pub async fn sync_backend(&self) -> Result<usize, GovernanceError> {
        let token = self.sync_gen.fetch_add(1, Ordering::SeqCst) + 1;
        let page = self.backend.list_proposals().await?;

        if self.sync_gen.load(Ordering::SeqCst) != token {
            debug!("backend sync superseded mid-flight; discarding response");
            return Ok(0);
        }

        let ids: Vec<u64> = {
            let mut store = self.store.write().expect("proposal store lock poisoned");
            page.proposals
                .into_iter()
                .map(|dto| {
                    let id = dto.id;
                    store.resolve(dto.into_observation());
                    id
                })
                .collect()
        };

        let count = ids.len();
        let results = join_all(ids.iter().map(|&id| self.refresh_from_chain(id))).await;
        for (id, result) in ids.into_iter().zip(results) {
            if let Err(error) = result {
                warn!(id, %error, "chain refresh after backend sync failed");
            }
        }
        debug!(count, "backend sync complete");
        Ok(count)
    }

    /// Read the authoritative proposal struct for one id and checkpoint it
    /// into the store, replacing locally accumulated tallies wholesale.
    ///
    /// A newer re-read request for the same id supersedes this one: if the
    /// generation advanced while the read was in flight, the late result is
    /// discarded.
    pub async fn refresh_from_chain(&self, id: u64) -> Result<(), GovernanceError> {
        let token = {
            let mut generations = self.reread_gen.lock().expect("generation map lock poisoned");
            let entry = generations.entry(id).or_insert(0);
            *entry += 1;
            *entry
        };

        let snapshot = self.chain.get_proposal(id).await?;

        let current = {
            let generations = self.reread_gen.lock().expect("generation map lock poisoned");
            generations.get(&id).copied().unwrap_or(0)
        };
        if current != token {
            debug!(id, "discarding stale chain read");
            return Ok(());
        }

        self.store
            .write()
            .expect("proposal store lock poisoned")
            .checkpoint(&snapshot);
        Ok(())
    }

    /// Ingest one chain event observation, then re-read chain state for the
    /// affected proposal to pick up whatever the event does not carry.
    pub async fn handle_event(&self, event: ChainEvent) {
        match event {
            ChainEvent::ProposalCreated {
                id,
                creator,
                description,
            } => {
                {
                    let mut store = self.store.write().expect("proposal store lock poisoned");
                    store.resolve(ProposalObservation {
                        onchain_id: Some(id),
                        creator: Some(creator),
                        description: Some(description),
                        ..Default::default()
                    });
                }
                self.refresh_logged(id).await;
            }
            ChainEvent::Voted {
                id,
                voter,
                support,
                weight,
            } => {
                let choice = VoteChoice::from_support(support);
                let weight = weight.unwrap_or_else(BigUint::one);
                let outcome = {
                    let mut store = self.store.write().expect("proposal store lock poisoned");
                    store.record_vote(id, voter.clone(), choice, weight)
                };
                if outcome == Some(VoteOutcome::Ignored) {
                    debug!(id, voter = %voter, "duplicate vote event ignored");
                }
                self.refresh_logged(id).await;
                if outcome.is_none() {
                    // The proposal was unknown when the event arrived; the
                    // re-read has materialized it with the vote already in
                    // its tallies, so register the voter without a delta.
                    let mut store = self.store.write().expect("proposal store lock poisoned");
                    store.note_voter(id, voter, choice);
                }
            }
            ChainEvent::ProposalExecuted { id } => {
                {
                    let mut store = self.store.write().expect("proposal store lock poisoned");
                    store.mark_executed(id, None);
                }
                self.refresh_logged(id).await;
            }
        }
    }

    /// Drain typed observations pushed by the chain event listener until the
    /// channel closes.
    pub async fn run_events(&self, mut events: mpsc::UnboundedReceiver<ChainEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("event channel closed; reconciliation loop ending");
    }

    async fn refresh_logged(&self, id: u64) {
        if let Err(error) = self.refresh_from_chain(id).await {
            warn!(id, %error, "chain refresh after event failed");
        }
    }

    /// Resolve a single backend row (used by the post-write confirmation
    /// poll).
    pub fn ingest_dto(&self, dto: ProposalDto) {
        let mut store = self.store.write().expect("proposal store lock poisoned");
        store.resolve(dto.into_observation());
    }

    /// Apply an advisory tally row from the backend results endpoint.
    /// Returns false when the proposal is not in the store.
    pub fn apply_results(&self, results: &ResultsDto) -> bool {
        let mut store = self.store.write().expect("proposal store lock poisoned");
        if store.get_by_id(results.id).is_none() {
            return false;
        }
        store.resolve(ProposalObservation {
            onchain_id: Some(results.id),
            votes_for: Some(results.votes_for.clone()),
            votes_against: Some(results.votes_against.clone()),
            ..Default::default()
        });
        true
    }

    /// Insert an optimistic Pending proposal (create orchestration, step 2).
    pub fn insert_pending(&self, description: &str, creator: Address) -> String {
        self.store
            .write()
            .expect("proposal store lock poisoned")
            .insert_pending(description, creator)
    }

    /// Roll back an optimistic entry whose submission failed.
    pub fn discard_pending(&self, local_key: &str) -> bool {
        self.store
            .write()
            .expect("proposal store lock poisoned")
            .remove_pending(local_key)
    }

    pub fn snapshot(&self) -> Vec<Proposal> {
        self.store
            .read()
            .expect("proposal store lock poisoned")
            .snapshot()
    }

    pub fn proposal(&self, id: u64) -> Option<Proposal> {
        self.store
            .read()
            .expect("proposal store lock poisoned")
            .get_by_id(id)
            .cloned()
    }

    pub fn proposal_by_key(&self, key: &str) -> Option<Proposal> {
        self.store
            .read()
            .expect("proposal store lock poisoned")
            .get_by_key(key)
            .cloned()
    }

    /// Re-locate a proposal by its creation identity after the optimistic
    /// key has been replaced by the on-chain id.
    pub fn find_match(&self, creator: &Address, description: &str) -> Option<Proposal> {
        self.store
            .read()
            .expect("proposal store lock poisoned")
            .find_match(creator, description)
            .cloned()
    }

    /// Register the caller's own vote without a weight guess; the follow-up
    /// chain read brings the weighted tally.
    pub fn note_vote(&self, id: u64, voter: Address, choice: VoteChoice) {
        self.store
            .write()
            .expect("proposal store lock poisoned")
            .note_voter(id, voter, choice);
    }

    /// Advance a proposal to Executed after a successful execute action.
    pub fn mark_executed(&self, id: u64, executor: Option<Address>) {
        self.store
            .write()
            .expect("proposal store lock poisoned")
            .mark_executed(id, executor);
    }

    /// Advance a defeated proposal to Finalized after a successful finalize
    /// action.
    pub fn mark_finalized(&self, id: u64) {
        self.store
            .write()
            .expect("proposal store lock poisoned")
            .mark_finalized(id);
    }

    pub fn has_voted_locally(&self, id: u64, voter: &Address) -> bool {
        self.store
            .read()
            .expect("proposal store lock poisoned")
            .get_by_id(id)
            .map(|p| p.ballots.has_voted(voter))
            .unwrap_or(false)
    }
}
