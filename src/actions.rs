use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use num_bigint::BigUint;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::eligibility::evaluate;
use crate::engine::ReconciliationEngine;
use crate::errors::GovernanceError;
use crate::sources::{BackendReader, ChainReader, TransactionSubmitter};
use crate::types::{Address, DaoParams, ProposalStatus, VoteChoice};

/// Hard wall-clock deadline for the post-write backend confirmation poll,
/// independent of the transport's own timeouts.
pub const CONFIRM_POLL_TIMEOUT: Duration = Duration::from_secs(10);
pub const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a write action.
#[derive(Debug, Clone)]
pub struct ActionReceipt {
    pub tx_hash: String,
    pub proposal_id: Option<u64>,
    /// False when the backend did not index the write before the poll
    /// deadline. Not a failure: the optimistic/chain-sourced view stands
    /// until the indexer catches up.
    pub confirmed: bool,
}

/// Write-action orchestrators. Every action follows the same template:
/// validate local preconditions, apply the optimistic mutation where one
/// applies (create only), submit the transaction, then poll the backend with
/// a bounded deadline and merge whatever it indexed.
pub struct Actions {
    engine: Arc<ReconciliationEngine>,
    backend: Arc<dyn BackendReader>,
    chain: Arc<dyn ChainReader>,
    submitter: Arc<dyn TransactionSubmitter>,
    params: DaoParams,
    caller: Address,
}

impl Actions {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        backend: Arc<dyn BackendReader>,
        chain: Arc<dyn ChainReader>,
        submitter: Arc<dyn TransactionSubmitter>,
        params: DaoParams,
        caller: Address,
    ) -> Self {
        Actions {
            engine,
            backend,
            chain,
            submitter,
            params,
            caller,
        }
    }

    pub fn caller(&self) -> &Address {
        &self.caller
    }

    pub fn params(&self) -> &DaoParams {
        &self.params
    }

    /// Create a proposal. The optimistic Pending entry is inserted before
    /// submission so the view reflects intent immediately, and removed again
    /// if the submission fails.
    pub async fn create(&self, description: &str) -> Result<ActionReceipt, GovernanceError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(GovernanceError::EmptyDescription);
        }
        self.require_wallet()?;

        let local_key = self.engine.insert_pending(description, self.caller.clone());
        debug!(%local_key, "optimistic proposal inserted");

        let receipt = match self.submitter.submit_create(description).await {
            Ok(receipt) => receipt,
            Err(error) => {
                self.engine.discard_pending(&local_key);
                debug!(%local_key, "optimistic proposal rolled back");
                return Err(error);
            }
        };
        info!(tx = %receipt.tx_hash, "proposal creation accepted");

        let proposal_id = self
            .await_create_indexed(receipt.proposal_id, description)
            .await
            .or(receipt.proposal_id);

        if let Some(id) = proposal_id {
            if let Err(error) = self.engine.refresh_from_chain(id).await {
                warn!(id, %error, "chain refresh after create failed");
            }
        }

        Ok(ActionReceipt {
            tx_hash: receipt.tx_hash,
            proposal_id,
            confirmed: proposal_id.is_some(),
        })
    }

    /// Cast a vote. No optimistic tally mutation: the caller is noted in the
    /// ledger after submission (dedup without a weight guess) and the
    /// weighted truth arrives with the follow-up chain read.
    pub async fn vote(&self, id: u64, choice: VoteChoice) -> Result<ActionReceipt, GovernanceError> {
        self.require_wallet()?;
        let proposal = self
            .engine
            .proposal(id)
            .ok_or_else(|| GovernanceError::UnknownProposal(id.to_string()))?;
        if proposal.status == ProposalStatus::Pending {
            return Err(GovernanceError::NotConfirmed(id.to_string()));
        }
        if proposal.status.is_terminal() {
            return Err(GovernanceError::VotingClosed(id));
        }
        if let Some(end) = proposal.vote_window_end(&self.params) {
            if Utc::now().timestamp() >= end {
                return Err(GovernanceError::VotingClosed(id));
            }
        }
        if proposal.ballots.has_voted(&self.caller) {
            return Err(GovernanceError::AlreadyVoted {
                id,
                voter: self.caller.to_string(),
            });
        }
        // The local ledger only knows what this session observed; the
        // contract's answer is authoritative when reachable.
        match self.chain.has_voted(id, &self.caller).await {
            Ok(true) => {
                self.engine.note_vote(id, self.caller.clone(), choice);
                return Err(GovernanceError::AlreadyVoted {
                    id,
                    voter: self.caller.to_string(),
                });
            }
            Ok(false) => {}
            Err(error) => {
                debug!(%error, "hasVoted pre-check unavailable; trusting local ledger");
            }
        }

        let pre_total = proposal.total_votes();
        let receipt = self.submitter.submit_vote(id, choice.as_support()).await?;
        info!(id, %choice, tx = %receipt.tx_hash, "vote accepted");

        self.engine.note_vote(id, self.caller.clone(), choice);
        if let Err(error) = self.engine.refresh_from_chain(id).await {
            warn!(id, %error, "chain refresh after vote failed");
        }
        let confirmed = self.await_results_indexed(id, &pre_total).await;

        Ok(ActionReceipt {
            tx_hash: receipt.tx_hash,
            proposal_id: Some(id),
            confirmed,
        })
    }

    /// Execute a passed proposal. Eligibility is evaluated locally (with the
    /// contract's quorum answer when reachable) before any transaction is
    /// submitted.
    pub async fn execute(&self, id: u64) -> Result<ActionReceipt, GovernanceError> {
        self.require_wallet()?;
        let proposal = self
            .engine
            .proposal(id)
            .ok_or_else(|| GovernanceError::UnknownProposal(id.to_string()))?;
        if proposal.status == ProposalStatus::Pending {
            return Err(GovernanceError::NotConfirmed(id.to_string()));
        }

        let chain_quorum = match self.chain.has_quorum(id).await {
            Ok(met) => Some(met),
            Err(error) => {
                debug!(%error, "hasQuorum unavailable; falling back to local total");
                None
            }
        };
        let eligibility = evaluate(
            &proposal,
            &self.params,
            &self.caller,
            Utc::now().timestamp(),
            chain_quorum,
        );
        if !eligibility.can_execute {
            return Err(GovernanceError::NotEligible {
                reasons: eligibility.reasons,
            });
        }

        let receipt = self.submitter.submit_execute(id).await?;
        info!(id, tx = %receipt.tx_hash, "proposal executed");

        self.engine.mark_executed(id, Some(self.caller.clone()));
        if let Err(error) = self.engine.refresh_from_chain(id).await {
            warn!(id, %error, "chain refresh after execute failed");
        }
        let confirmed = self.await_backend_flag(id, false).await;

        Ok(ActionReceipt {
            tx_hash: receipt.tx_hash,
            proposal_id: Some(id),
            confirmed,
        })
    }

    /// Close a defeated proposal without executing it.
    pub async fn finalize(&self, id: u64) -> Result<ActionReceipt, GovernanceError> {
        self.require_wallet()?;
        let proposal = self
            .engine
            .proposal(id)
            .ok_or_else(|| GovernanceError::UnknownProposal(id.to_string()))?;
        if proposal.status == ProposalStatus::Pending {
            return Err(GovernanceError::NotConfirmed(id.to_string()));
        }

        let eligibility = evaluate(
            &proposal,
            &self.params,
            &self.caller,
            Utc::now().timestamp(),
            None,
        );
        if !eligibility.can_finalize {
            return Err(GovernanceError::NotEligible {
                reasons: eligibility.reasons,
            });
        }

        let receipt = self.submitter.submit_finalize(id).await?;
        info!(id, tx = %receipt.tx_hash, "proposal finalized");

        self.engine.mark_finalized(id);
        if let Err(error) = self.engine.refresh_from_chain(id).await {
            warn!(id, %error, "chain refresh after finalize failed");
        }
        let confirmed = self.await_backend_flag(id, true).await;

        Ok(ActionReceipt {
            tx_hash: receipt.tx_hash,
            proposal_id: Some(id),
            confirmed,
        })
    }

    fn require_wallet(&self) -> Result<(), GovernanceError> {
        if self.caller.as_str().is_empty() {
            return Err(GovernanceError::WalletNotConnected);
        }
        Ok(())
    }

    /// Poll the backend until the created proposal is indexed. With a known
    /// id this targets the detail endpoint; otherwise each attempt runs a
    /// full backend sync and re-locates the entry by its creation identity.
    async fn await_create_indexed(&self, known_id: Option<u64>, description: &str) -> Option<u64> {
        let deadline = Instant::now() + CONFIRM_POLL_TIMEOUT;
        loop {
            let found = match known_id {
                Some(id) => match self.backend.proposal(id).await {
                    Ok(Some(dto)) => {
                        self.engine.ingest_dto(dto);
                        Some(id)
                    }
                    Ok(None) => None,
                    Err(error) if error.is_transient() => {
                        debug!(%error, "confirmation poll attempt failed");
                        None
                    }
                    Err(error) => {
                        warn!(%error, "confirmation poll aborted");
                        return None;
                    }
                },
                None => {
                    match self.engine.sync_backend().await {
                        Ok(_) => {}
                        Err(error) if error.is_transient() => {
                            debug!(%error, "confirmation sync attempt failed")
                        }
                        Err(error) => {
                            warn!(%error, "confirmation poll aborted");
                            return None;
                        }
                    }
                    self.engine
                        .find_match(&self.caller, description)
                        .and_then(|p| p.id)
                }
            };
            if found.is_some() {
                return found;
            }
            if Instant::now() + CONFIRM_POLL_INTERVAL > deadline {
                warn!("backend did not index the proposal in time; confirmation still pending");
                return None;
            }
            sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }

    /// Poll the results endpoint until the backend's tally total moves past
    /// its pre-vote value.
    async fn await_results_indexed(&self, id: u64, pre_total: &BigUint) -> bool {
        let deadline = Instant::now() + CONFIRM_POLL_TIMEOUT;
        loop {
            match self.backend.results(id).await {
                Ok(Some(results)) => {
                    let total = &results.votes_for + &results.votes_against;
                    if &total > pre_total {
                        self.engine.apply_results(&results);
                        return true;
                    }
                }
                Ok(None) => debug!(id, "results not indexed yet"),
                Err(error) if error.is_transient() => {
                    debug!(%error, "results poll attempt failed")
                }
                Err(error) => {
                    warn!(%error, "results poll aborted");
                    return false;
                }
            }
            if Instant::now() + CONFIRM_POLL_INTERVAL > deadline {
                warn!(id, "backend did not index the vote in time; confirmation still pending");
                return false;
            }
            sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }

    /// Poll the detail endpoint until the executed (or finalized) flag is
    /// indexed.
    async fn await_backend_flag(&self, id: u64, want_finalized: bool) -> bool {
        let deadline = Instant::now() + CONFIRM_POLL_TIMEOUT;
        loop {
            match self.backend.proposal(id).await {
                Ok(Some(dto)) => {
                    let done = if want_finalized {
                        dto.finalized == Some(true)
                    } else {
                        dto.executed
                    };
                    if done {
                        self.engine.ingest_dto(dto);
                        return true;
                    }
                }
                Ok(None) => debug!(id, "proposal not indexed yet"),
                Err(error) if error.is_transient() => {
                    debug!(%error, "flag poll attempt failed")
                }
                Err(error) => {
                    warn!(%error, "flag poll aborted");
                    return false;
                }
            }
            if Instant::now() + CONFIRM_POLL_INTERVAL > deadline {
                warn!(id, "backend flag not indexed in time; confirmation still pending");
                return false;
            }
            sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{
        MockBackendReader, MockChainReader, MockTransactionSubmitter, ProposalsPage,
    };
    use crate::types::{ChainEvent, OnchainProposal, TxReceipt};

    fn params(owner: &str, quorum: u64) -> DaoParams {
        DaoParams {
            owner: Address::new(owner),
            quorum_threshold: BigUint::from(quorum),
            vote_duration_secs: 3600,
        }
    }

    fn actions_with(
        backend: MockBackendReader,
        chain: MockChainReader,
        submitter: MockTransactionSubmitter,
        caller: &str,
    ) -> (Arc<ReconciliationEngine>, Actions) {
        let backend: Arc<dyn BackendReader> = Arc::new(backend);
        let chain: Arc<dyn ChainReader> = Arc::new(chain);
        let engine = Arc::new(ReconciliationEngine::new(backend.clone(), chain.clone()));
        let actions = Actions::new(
            engine.clone(),
            backend,
            chain,
            Arc::new(submitter),
            params("0xOwner", 100),
            Address::new(caller),
        );
        (engine, actions)
    }

    #[tokio::test]
    async fn test_create_rejects_empty_description_before_submitting() {
        // No expectations on the submitter: any call would panic the test
        let (engine, actions) = actions_with(
            MockBackendReader::new(),
            MockChainReader::new(),
            MockTransactionSubmitter::new(),
            "0xCreator",
        );
        let err = actions.create("   ").await.unwrap_err();
        assert!(matches!(err, GovernanceError::EmptyDescription));
        assert!(engine.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_create_rolls_back_optimistic_entry_on_submit_failure() {
        let mut submitter = MockTransactionSubmitter::new();
        submitter
            .expect_submit_create()
            .times(1)
            .returning(|_| Err(GovernanceError::Transport("nonce too low".into())));

        let (engine, actions) = actions_with(
            MockBackendReader::new(),
            MockChainReader::new(),
            submitter,
            "0xCreator",
        );
        let err = actions.create("double the grant budget").await.unwrap_err();
        assert!(matches!(err, GovernanceError::Transport(_)));
        assert!(
            engine.snapshot().is_empty(),
            "no partial state after rollback"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_confirms_once_backend_indexes() {
        let mut submitter = MockTransactionSubmitter::new();
        submitter.expect_submit_create().times(1).returning(|_| {
            Ok(TxReceipt {
                tx_hash: "0xhash".into(),
                proposal_id: Some(11),
            })
        });

        let mut backend = MockBackendReader::new();
        let mut misses = 2;
        backend.expect_proposal().returning(move |id| {
            if misses > 0 {
                misses -= 1;
                Ok(None)
            } else {
                Ok(Some(
                    serde_json::from_value(serde_json::json!({
                        "id": id,
                        "description": "double the grant budget",
                        "executed": false,
                        "creator": "0xcreator",
                        "votesFor": "0",
                        "votesAgainst": "0",
                    }))
                    .unwrap(),
                ))
            }
        });

        let mut chain = MockChainReader::new();
        chain.expect_get_proposal().returning(|id| {
            Ok(OnchainProposal {
                id,
                description: "double the grant budget".into(),
                executed: false,
                votes_for: BigUint::from(0u32),
                votes_against: BigUint::from(0u32),
                created_at: 1_700_000_000,
            })
        });

        let (engine, actions) = actions_with(backend, chain, submitter, "0xCreator");
        let receipt = actions.create("double the grant budget").await.unwrap();
        assert!(receipt.confirmed);
        assert_eq!(receipt.proposal_id, Some(11));

        // One entry: optimistic row bridged into the indexed identity
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, Some(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_poll_timeout_is_nonfatal() {
        let mut submitter = MockTransactionSubmitter::new();
        submitter.expect_submit_create().returning(|_| {
            Ok(TxReceipt {
                tx_hash: "0xhash".into(),
                proposal_id: None,
            })
        });

        let mut backend = MockBackendReader::new();
        backend
            .expect_list_proposals()
            .returning(|| Ok(ProposalsPage { total: 0, proposals: vec![] }));

        let (engine, actions) = actions_with(
            backend,
            MockChainReader::new(),
            submitter,
            "0xCreator",
        );
        let receipt = actions.create("slow indexer").await.unwrap();
        assert!(!receipt.confirmed, "timeout means still pending, not failed");
        assert!(receipt.proposal_id.is_none());

        // The optimistic entry is kept as the best available view
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, ProposalStatus::Pending);
    }

    #[tokio::test]
    async fn test_vote_rejects_double_vote_without_submitting() {
        let mut chain = MockChainReader::new();
        chain.expect_get_proposal().returning(|id| {
            Ok(OnchainProposal {
                id,
                description: "p".into(),
                executed: false,
                votes_for: BigUint::from(1u32),
                votes_against: BigUint::from(0u32),
                created_at: Utc::now().timestamp(),
            })
        });

        let (engine, actions) = actions_with(
            MockBackendReader::new(),
            chain,
            MockTransactionSubmitter::new(),
            "0xVoter",
        );
        engine
            .handle_event(ChainEvent::ProposalCreated {
                id: 1,
                creator: Address::new("0xC"),
                description: "p".into(),
            })
            .await;
        engine
            .handle_event(ChainEvent::Voted {
                id: 1,
                voter: Address::new("0xVOTER"),
                support: true,
                weight: None,
            })
            .await;

        let err = actions.vote(1, VoteChoice::Against).await.unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyVoted { .. }));
    }

    #[tokio::test]
    async fn test_execute_rejected_with_full_reason_list() {
        let mut chain = MockChainReader::new();
        chain.expect_get_proposal().returning(|id| {
            Ok(OnchainProposal {
                id,
                description: "tied".into(),
                executed: false,
                votes_for: BigUint::from(5u32),
                votes_against: BigUint::from(5u32),
                created_at: Utc::now().timestamp(),
            })
        });
        chain.expect_has_quorum().returning(|_| Ok(false));

        // Caller is not the owner either
        let (engine, actions) = actions_with(
            MockBackendReader::new(),
            chain,
            MockTransactionSubmitter::new(),
            "0xNobody",
        );
        engine
            .handle_event(ChainEvent::ProposalCreated {
                id: 3,
                creator: Address::new("0xC"),
                description: "tied".into(),
            })
            .await;

        let err = actions.execute(3).await.unwrap_err();
        match err {
            GovernanceError::NotEligible { reasons } => {
                assert!(reasons.len() >= 3, "window, majority, quorum, owner: {reasons:?}");
            }
            other => panic!("expected NotEligible, got {other}"),
        }
    }
}
