use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::GovernanceError;
use crate::sources::{biguint_flexible, ChainReader, EventSource, TransactionSubmitter};
use crate::types::{Address, ChainEvent, OnchainProposal, TxReceipt};

/// JSON-RPC 2.0 gateway to the wallet signer bridge.
///
/// The bridge holds the signing key and fronts the governance contract: read
/// methods proxy `eth_call`-style lookups, write methods sign, broadcast and
/// wait for the transaction receipt before answering. That receipt-waiting
/// behavior is what lets the orchestrators treat submission as one awaited
/// call.
pub struct RpcChain {
    http: reqwest::Client,
    url: String,
    caller: Address,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposalStructDto {
    id: u64,
    description: String,
    executed: bool,
    #[serde(deserialize_with = "biguint_flexible")]
    votes_for: BigUint,
    #[serde(deserialize_with = "biguint_flexible")]
    votes_against: BigUint,
    created_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptDto {
    tx_hash: String,
    #[serde(default)]
    proposal_id: Option<u64>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum EventDto {
    ProposalCreated {
        id: u64,
        creator: String,
        description: String,
    },
    Voted {
        id: u64,
        voter: String,
        support: bool,
        #[serde(default, deserialize_with = "crate::sources::biguint_flexible_opt")]
        weight: Option<BigUint>,
    },
    ProposalExecuted {
        id: u64,
    },
}

impl From<EventDto> for ChainEvent {
    fn from(dto: EventDto) -> Self {
        match dto {
            EventDto::ProposalCreated {
                id,
                creator,
                description,
            } => ChainEvent::ProposalCreated {
                id,
                creator: Address::new(&creator),
                description,
            },
            EventDto::Voted {
                id,
                voter,
                support,
                weight,
            } => ChainEvent::Voted {
                id,
                voter: Address::new(&voter),
                support,
                weight,
            },
            EventDto::ProposalExecuted { id } => ChainEvent::ProposalExecuted { id },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPageDto {
    events: Vec<EventDto>,
    next_cursor: u64,
}

impl RpcChain {
    pub fn new(url: &str, caller: Address) -> Self {
        RpcChain {
            http: reqwest::Client::new(),
            url: url.to_string(),
            caller,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, GovernanceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, "rpc call");
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GovernanceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GovernanceError::Transport(format!(
                "bridge returned {} for {method}",
                response.status()
            )));
        }

        let payload: RpcResponse = response
            .json()
            .await
            .map_err(|e| GovernanceError::Malformed(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(GovernanceError::Transport(format!(
                "{method} failed: {} (code {})",
                error.message, error.code
            )));
        }
        payload
            .result
            .ok_or_else(|| GovernanceError::Malformed(format!("{method} returned no result")))
    }

    async fn call_as<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, GovernanceError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| GovernanceError::Malformed(format!("{method}: {e}")))
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn get_proposal(&self, id: u64) -> Result<OnchainProposal, GovernanceError> {
        let dto: ProposalStructDto = self.call_as("gov_getProposal", json!([id])).await?;
        Ok(OnchainProposal {
            id: dto.id,
            description: dto.description,
            executed: dto.executed,
            votes_for: dto.votes_for,
            votes_against: dto.votes_against,
            created_at: dto.created_at,
        })
    }

    async fn has_voted(&self, id: u64, voter: &Address) -> Result<bool, GovernanceError> {
        self.call_as("gov_hasVoted", json!([id, voter.as_str()]))
            .await
    }

    async fn has_quorum(&self, id: u64) -> Result<bool, GovernanceError> {
        self.call_as("gov_hasQuorum", json!([id])).await
    }

    async fn owner(&self) -> Result<Address, GovernanceError> {
        let raw: String = self.call_as("gov_owner", json!([])).await?;
        Ok(Address::new(&raw))
    }

    async fn quorum_threshold(&self) -> Result<BigUint, GovernanceError> {
        let raw = self.call("gov_quorumThreshold", json!([])).await?;
        match &raw {
            Value::Number(n) => BigUint::parse_bytes(n.to_string().as_bytes(), 10),
            Value::String(s) => BigUint::parse_bytes(s.trim().as_bytes(), 10),
            _ => None,
        }
        .ok_or_else(|| GovernanceError::Malformed(format!("bad quorum threshold: {raw}")))
    }

    async fn vote_duration(&self) -> Result<u64, GovernanceError> {
        let raw = self.call("gov_voteDuration", json!([])).await?;
        match &raw {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| GovernanceError::Malformed(format!("bad vote duration: {raw}")))
    }
}

#[async_trait]
impl TransactionSubmitter for RpcChain {
    async fn submit_create(&self, description: &str) -> Result<TxReceipt, GovernanceError> {
        let dto: ReceiptDto = self
            .call_as(
                "gov_createProposal",
                json!([description, self.caller.as_str()]),
            )
            .await?;
        Ok(TxReceipt {
            tx_hash: dto.tx_hash,
            proposal_id: dto.proposal_id,
        })
    }

    async fn submit_vote(&self, id: u64, support: bool) -> Result<TxReceipt, GovernanceError> {
        let dto: ReceiptDto = self
            .call_as("gov_vote", json!([id, support, self.caller.as_str()]))
            .await?;
        Ok(TxReceipt {
            tx_hash: dto.tx_hash,
            proposal_id: Some(id),
        })
    }

    async fn submit_execute(&self, id: u64) -> Result<TxReceipt, GovernanceError> {
        let dto: ReceiptDto = self
            .call_as("gov_executeProposal", json!([id, self.caller.as_str()]))
            .await?;
        Ok(TxReceipt {
            tx_hash: dto.tx_hash,
            proposal_id: Some(id),
        })
    }

    async fn submit_finalize(&self, id: u64) -> Result<TxReceipt, GovernanceError> {
        let dto: ReceiptDto = self
            .call_as("gov_finalizeProposal", json!([id, self.caller.as_str()]))
            .await?;
        Ok(TxReceipt {
            tx_hash: dto.tx_hash,
            proposal_id: Some(id),
        })
    }
}

#[async_trait]
impl EventSource for RpcChain {
    async fn poll_events(&self, cursor: u64) -> Result<(Vec<ChainEvent>, u64), GovernanceError> {
        let page: EventPageDto = self.call_as("gov_pollEvents", json!([cursor])).await?;
        Ok((
            page.events.into_iter().map(ChainEvent::from).collect(),
            page.next_cursor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_struct_decodes_string_votes() {
        let dto: ProposalStructDto = serde_json::from_value(json!({
            "id": 3,
            "description": "upgrade treasury",
            "executed": false,
            "votesFor": "1000000000000000000",
            "votesAgainst": 2,
            "createdAt": 1_700_000_000,
        }))
        .unwrap();
        assert_eq!(
            dto.votes_for,
            BigUint::parse_bytes(b"1000000000000000000", 10).unwrap()
        );
        assert_eq!(dto.votes_against, BigUint::from(2u32));
    }

    #[test]
    fn test_event_decoding() {
        let page: EventPageDto = serde_json::from_value(json!({
            "events": [
                {"type": "ProposalCreated", "id": 1, "creator": "0xAB", "description": "d"},
                {"type": "Voted", "id": 1, "voter": "0xCD", "support": true, "weight": "5"},
                {"type": "ProposalExecuted", "id": 1},
            ],
            "nextCursor": 7,
        }))
        .unwrap();
        assert_eq!(page.events.len(), 3);
        assert_eq!(page.next_cursor, 7);

        let events: Vec<ChainEvent> = page.events.into_iter().map(ChainEvent::from).collect();
        match &events[1] {
            ChainEvent::Voted { voter, weight, .. } => {
                assert_eq!(voter, &Address::new("0xcd"));
                assert_eq!(weight, &Some(BigUint::from(5u32)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_vote_event_without_weight() {
        let dto: EventDto = serde_json::from_value(json!({
            "type": "Voted", "id": 2, "voter": "0xEF", "support": false,
        }))
        .unwrap();
        match ChainEvent::from(dto) {
            ChainEvent::Voted { weight, .. } => assert!(weight.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_receipt_without_proposal_id() {
        let dto: ReceiptDto = serde_json::from_value(json!({"txHash": "0xfeed"})).unwrap();
        assert_eq!(dto.tx_hash, "0xfeed");
        assert!(dto.proposal_id.is_none());
    }
}
