use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::GovernanceError;
use crate::store::ProposalObservation;
use crate::types::{Address, ChainEvent, OnchainProposal, TxReceipt};

/// REST backend that indexes proposal and vote data with unknown latency.
/// Advisory source: its rows seed the store fast, the chain corrects them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendReader: Send + Sync {
    async fn list_proposals(&self) -> Result<ProposalsPage, GovernanceError>;

    /// `Ok(None)` when the backend has not indexed the proposal yet (404),
    /// the expected transient state while polling after a write.
    async fn proposal(&self, id: u64) -> Result<Option<ProposalDto>, GovernanceError>;

    async fn results(&self, id: u64) -> Result<Option<ResultsDto>, GovernanceError>;
}

/// Direct contract reads. Authoritative for tallies and flags.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_proposal(&self, id: u64) -> Result<OnchainProposal, GovernanceError>;
    async fn has_voted(&self, id: u64, voter: &Address) -> Result<bool, GovernanceError>;
    async fn has_quorum(&self, id: u64) -> Result<bool, GovernanceError>;
    async fn owner(&self) -> Result<Address, GovernanceError>;
    async fn quorum_threshold(&self) -> Result<BigUint, GovernanceError>;
    async fn vote_duration(&self) -> Result<u64, GovernanceError>;
}

/// Write path. Each call resolves once the transaction receipt is available,
/// so a returned `Ok` means the node accepted the write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit_create(&self, description: &str) -> Result<TxReceipt, GovernanceError>;
    async fn submit_vote(&self, id: u64, support: bool) -> Result<TxReceipt, GovernanceError>;
    async fn submit_execute(&self, id: u64) -> Result<TxReceipt, GovernanceError>;
    async fn submit_finalize(&self, id: u64) -> Result<TxReceipt, GovernanceError>;
}

/// Cursor-based feed of typed chain events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events recorded after `cursor`, plus the cursor to resume from.
    async fn poll_events(&self, cursor: u64) -> Result<(Vec<ChainEvent>, u64), GovernanceError>;
}

/// `GET /proposals` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalsPage {
    pub total: u64,
    pub proposals: Vec<ProposalDto>,
}

/// One indexed proposal row. Numeric vote fields arrive as JSON numbers or
/// decimal strings depending on the backend version; both parse into
/// `BigUint` without precision loss.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDto {
    pub id: u64,
    pub description: String,
    pub executed: bool,
    #[serde(default)]
    pub finalized: Option<bool>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "biguint_flexible_opt")]
    pub votes_for: Option<BigUint>,
    #[serde(default, deserialize_with = "biguint_flexible_opt")]
    pub votes_against: Option<BigUint>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl ProposalDto {
    pub fn into_observation(self) -> ProposalObservation {
        ProposalObservation {
            onchain_id: Some(self.id),
            creator: self.creator.as_deref().map(Address::new),
            description: Some(self.description),
            executed: Some(self.executed),
            finalized: self.finalized,
            executor: self.executor.as_deref().map(Address::new),
            votes_for: self.votes_for,
            votes_against: self.votes_against,
            created_at: self.created_at,
        }
    }
}

/// `GET /results/{id}` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsDto {
    pub id: u64,
    #[serde(deserialize_with = "biguint_flexible")]
    pub votes_for: BigUint,
    #[serde(deserialize_with = "biguint_flexible")]
    pub votes_against: BigUint,
}

fn biguint_from_value<E: de::Error>(value: &Value) -> Result<BigUint, E> {
    match value {
        Value::Number(n) => BigUint::parse_bytes(n.to_string().as_bytes(), 10)
            .ok_or_else(|| E::custom(format!("non-integer vote count: {n}"))),
        Value::String(s) => BigUint::parse_bytes(s.trim().as_bytes(), 10)
            .ok_or_else(|| E::custom(format!("invalid vote count: {s:?}"))),
        other => Err(E::custom(format!(
            "expected number or decimal string, got {other}"
        ))),
    }
}

pub(crate) fn biguint_flexible<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    biguint_from_value(&value)
}

pub(crate) fn biguint_flexible_opt<'de, D>(deserializer: D) -> Result<Option<BigUint>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => biguint_from_value(&value).map(Some),
    }
}
