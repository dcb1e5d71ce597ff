use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::ledger::Ballots;

/// Chain account address, normalized to lowercase at construction.
///
/// All address comparisons in the engine (voter dedup, owner checks,
/// optimistic matching) go through this type, which makes them
/// case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(raw: &str) -> Self {
        Address(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A voter's cast choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    For,
    Against,
}

impl VoteChoice {
    pub fn from_support(support: bool) -> Self {
        if support {
            VoteChoice::For
        } else {
            VoteChoice::Against
        }
    }

    pub fn as_support(self) -> bool {
        matches!(self, VoteChoice::For)
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteChoice::For => f.write_str("for"),
            VoteChoice::Against => f.write_str("against"),
        }
    }
}

/// Proposal lifecycle. Transitions are forward-only; `Finalized` and
/// `Executed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Confirmed,
    Finalized,
    Executed,
}

impl ProposalStatus {
    fn rank(self) -> u8 {
        match self {
            ProposalStatus::Pending => 0,
            ProposalStatus::Confirmed => 1,
            ProposalStatus::Finalized => 2,
            ProposalStatus::Executed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProposalStatus::Finalized | ProposalStatus::Executed)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Pending => f.write_str("pending"),
            ProposalStatus::Confirmed => f.write_str("confirmed"),
            ProposalStatus::Finalized => f.write_str("finalized"),
            ProposalStatus::Executed => f.write_str("executed"),
        }
    }
}

/// Session-cached DAO governance parameters, read from the chain once at
/// session start.
#[derive(Debug, Clone)]
pub struct DaoParams {
    pub owner: Address,
    pub quorum_threshold: BigUint,
    pub vote_duration_secs: u64,
}

/// The central governance entity, merged from all three sources.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Stable on-chain identifier, absent while only the optimistic local
    /// copy exists.
    pub id: Option<u64>,
    /// Client-generated lookup key; replaced by the on-chain id once known.
    pub local_key: String,
    pub description: String,
    pub creator: Address,
    pub executor: Option<Address>,
    pub status: ProposalStatus,
    pub ballots: Ballots,
    /// Chain timestamp (seconds) once known.
    pub created_at: Option<i64>,
}

impl Proposal {
    pub fn new_pending(local_key: String, description: &str, creator: Address) -> Self {
        Proposal {
            id: None,
            local_key,
            description: description.trim().to_string(),
            creator,
            executor: None,
            status: ProposalStatus::Pending,
            ballots: Ballots::new(),
            created_at: None,
        }
    }

    pub fn votes_for(&self) -> &BigUint {
        self.ballots.for_weight()
    }

    pub fn votes_against(&self) -> &BigUint {
        self.ballots.against_weight()
    }

    pub fn total_votes(&self) -> BigUint {
        self.ballots.total()
    }

    /// End of the voting window under the fixed-duration policy, unknown
    /// until the chain reports the creation timestamp.
    pub fn vote_window_end(&self, params: &DaoParams) -> Option<i64> {
        self.created_at
            .map(|created| created + params.vote_duration_secs as i64)
    }

    /// Advance the lifecycle; a transition that would move backwards (or out
    /// of a terminal state) is ignored.
    pub fn advance_status(&mut self, next: ProposalStatus) {
        if next.rank() > self.status.rank() {
            self.status = next;
        }
    }
}

/// Authoritative proposal snapshot from a direct contract read. Applying one
/// replaces locally accumulated tallies wholesale.
#[derive(Debug, Clone)]
pub struct OnchainProposal {
    pub id: u64,
    pub description: String,
    pub executed: bool,
    pub votes_for: BigUint,
    pub votes_against: BigUint,
    pub created_at: i64,
}

/// Typed observation pushed by the chain event listener.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    ProposalCreated {
        id: u64,
        creator: Address,
        description: String,
    },
    Voted {
        id: u64,
        voter: Address,
        support: bool,
        /// Absent when the protocol does not report weighted votes; counts
        /// as weight 1.
        weight: Option<BigUint>,
    },
    ProposalExecuted {
        id: u64,
    },
}

/// Receipt returned by the transaction submitter once the write is accepted
/// by the node.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: String,
    /// Populated by the bridge for proposal creation when the id can be
    /// decoded from the receipt logs.
    pub proposal_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let a = Address::new("  0xAbCdEf01  ");
        let b = Address::new("0xabcdef01");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xabcdef01");
    }

    #[test]
    fn test_status_forward_only() {
        let mut p = Proposal::new_pending("local-1".into(), "desc", Address::new("0x1"));
        p.advance_status(ProposalStatus::Confirmed);
        assert_eq!(p.status, ProposalStatus::Confirmed);

        p.advance_status(ProposalStatus::Pending);
        assert_eq!(p.status, ProposalStatus::Confirmed);

        p.advance_status(ProposalStatus::Executed);
        assert_eq!(p.status, ProposalStatus::Executed);

        // Terminal states never move again
        p.advance_status(ProposalStatus::Finalized);
        assert_eq!(p.status, ProposalStatus::Executed);
    }

    #[test]
    fn test_vote_window_requires_created_at() {
        let params = DaoParams {
            owner: Address::new("0x1"),
            quorum_threshold: BigUint::from(100u32),
            vote_duration_secs: 3600,
        };
        let mut p = Proposal::new_pending("local-1".into(), "desc", Address::new("0x1"));
        assert_eq!(p.vote_window_end(&params), None);

        p.created_at = Some(1_700_000_000);
        assert_eq!(p.vote_window_end(&params), Some(1_700_003_600));
    }

    #[test]
    fn test_description_trimmed_at_creation() {
        let p = Proposal::new_pending("local-1".into(), "  fund the grants round  ", Address::new("0x1"));
        assert_eq!(p.description, "fund the grants round");
    }
}
