// Hand-rolled fake adapters for flow tests. These control response content
// and timing, which generated mocks cannot hold across await points.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use num_bigint::BigUint;

use agora::errors::GovernanceError;
use agora::sources::{
    BackendReader, ChainReader, ProposalDto, ProposalsPage, ResultsDto, TransactionSubmitter,
};
use agora::types::{Address, OnchainProposal, TxReceipt};

pub fn onchain(id: u64, votes_for: u64, votes_against: u64, created_at: i64) -> OnchainProposal {
    OnchainProposal {
        id,
        description: format!("proposal {id}"),
        executed: false,
        votes_for: BigUint::from(votes_for),
        votes_against: BigUint::from(votes_against),
        created_at,
    }
}

pub fn dto(id: u64, description: &str) -> ProposalDto {
    ProposalDto {
        id,
        description: description.to_string(),
        executed: false,
        finalized: None,
        creator: Some("0xcreator".to_string()),
        votes_for: Some(BigUint::from(0u32)),
        votes_against: Some(BigUint::from(0u32)),
        executor: None,
        created_at: None,
    }
}

/// Contract reads served from in-memory maps.
pub struct FakeChain {
    pub snapshots: Mutex<HashMap<u64, OnchainProposal>>,
    pub quorum: Mutex<HashMap<u64, bool>>,
    pub voted: Mutex<HashSet<(u64, Address)>>,
    pub owner: Address,
    pub quorum_threshold: u64,
    pub vote_duration: u64,
}

impl FakeChain {
    pub fn new(owner: &str) -> Self {
        FakeChain {
            snapshots: Mutex::new(HashMap::new()),
            quorum: Mutex::new(HashMap::new()),
            voted: Mutex::new(HashSet::new()),
            owner: Address::new(owner),
            quorum_threshold: 100,
            vote_duration: 3600,
        }
    }

    pub fn put(&self, snap: OnchainProposal) {
        self.snapshots.lock().unwrap().insert(snap.id, snap);
    }

    pub fn set_quorum(&self, id: u64, met: bool) {
        self.quorum.lock().unwrap().insert(id, met);
    }

    pub fn set_voted(&self, id: u64, voter: &str) {
        self.voted.lock().unwrap().insert((id, Address::new(voter)));
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn get_proposal(&self, id: u64) -> Result<OnchainProposal, GovernanceError> {
        self.snapshots
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| GovernanceError::Transport(format!("no chain data for {id}")))
    }

    async fn has_voted(&self, id: u64, voter: &Address) -> Result<bool, GovernanceError> {
        Ok(self.voted.lock().unwrap().contains(&(id, voter.clone())))
    }

    async fn has_quorum(&self, id: u64) -> Result<bool, GovernanceError> {
        self.quorum
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .ok_or_else(|| GovernanceError::Transport(format!("no quorum data for {id}")))
    }

    async fn owner(&self) -> Result<Address, GovernanceError> {
        Ok(self.owner.clone())
    }

    async fn quorum_threshold(&self) -> Result<BigUint, GovernanceError> {
        Ok(BigUint::from(self.quorum_threshold))
    }

    async fn vote_duration(&self) -> Result<u64, GovernanceError> {
        Ok(self.vote_duration)
    }
}

/// Backend rows served from in-memory maps, with an optional number of
/// not-indexed-yet answers before the detail endpoint starts serving.
pub struct FakeBackend {
    pub page: Mutex<Vec<ProposalDto>>,
    pub details: Mutex<HashMap<u64, ProposalDto>>,
    pub results: Mutex<HashMap<u64, (u64, u64)>>,
    pub detail_misses: AtomicU64,
    pub fail_list: Mutex<bool>,
}

impl FakeBackend {
    pub fn new() -> Self {
        FakeBackend {
            page: Mutex::new(Vec::new()),
            details: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            detail_misses: AtomicU64::new(0),
            fail_list: Mutex::new(false),
        }
    }

    pub fn put_detail(&self, row: ProposalDto) {
        self.details.lock().unwrap().insert(row.id, row);
    }

    pub fn put_results(&self, id: u64, votes_for: u64, votes_against: u64) {
        self.results
            .lock()
            .unwrap()
            .insert(id, (votes_for, votes_against));
    }
}

#[async_trait]
impl BackendReader for FakeBackend {
    async fn list_proposals(&self) -> Result<ProposalsPage, GovernanceError> {
        if *self.fail_list.lock().unwrap() {
            return Err(GovernanceError::Transport("backend down".into()));
        }
        let proposals = self.page.lock().unwrap().clone();
        Ok(ProposalsPage {
            total: proposals.len() as u64,
            proposals,
        })
    }

    async fn proposal(&self, id: u64) -> Result<Option<ProposalDto>, GovernanceError> {
        if self.detail_misses.load(Ordering::SeqCst) > 0 {
            self.detail_misses.fetch_sub(1, Ordering::SeqCst);
            return Ok(None);
        }
        Ok(self.details.lock().unwrap().get(&id).cloned())
    }

    async fn results(&self, id: u64) -> Result<Option<ResultsDto>, GovernanceError> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&id)
            .map(|(votes_for, votes_against)| ResultsDto {
                id,
                votes_for: BigUint::from(*votes_for),
                votes_against: BigUint::from(*votes_against),
            }))
    }
}

/// Submitter that records calls and can be told to fail.
pub struct FakeSubmitter {
    pub calls: Mutex<Vec<String>>,
    pub fail_message: Mutex<Option<String>>,
    pub created_id: Option<u64>,
}

impl FakeSubmitter {
    pub fn new() -> Self {
        FakeSubmitter {
            calls: Mutex::new(Vec::new()),
            fail_message: Mutex::new(None),
            created_id: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        let submitter = Self::new();
        *submitter.fail_message.lock().unwrap() = Some(message.to_string());
        submitter
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn submit(&self, call: String, proposal_id: Option<u64>) -> Result<TxReceipt, GovernanceError> {
        self.calls.lock().unwrap().push(call);
        if let Some(message) = self.fail_message.lock().unwrap().as_ref() {
            return Err(GovernanceError::Transport(message.clone()));
        }
        Ok(TxReceipt {
            tx_hash: "0xtesttx".to_string(),
            proposal_id,
        })
    }
}

#[async_trait]
impl TransactionSubmitter for FakeSubmitter {
    async fn submit_create(&self, description: &str) -> Result<TxReceipt, GovernanceError> {
        self.submit(format!("create:{description}"), self.created_id)
    }

    async fn submit_vote(&self, id: u64, support: bool) -> Result<TxReceipt, GovernanceError> {
        self.submit(format!("vote:{id}:{support}"), Some(id))
    }

    async fn submit_execute(&self, id: u64) -> Result<TxReceipt, GovernanceError> {
        self.submit(format!("execute:{id}"), Some(id))
    }

    async fn submit_finalize(&self, id: u64) -> Result<TxReceipt, GovernanceError> {
        self.submit(format!("finalize:{id}"), Some(id))
    }
}
