use thiserror::Error;

/// Error taxonomy for the governance engine.
///
/// Validation and eligibility failures are resolved locally and never reach
/// the network. Transport failures are retryable. `NotIndexed` is the
/// expected transient state of a backend that has not caught up to the chain
/// yet and is not treated as a fault during polling.
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Proposal description must not be empty")]
    EmptyDescription,

    #[error("Wallet not connected. Run 'agora-cli wallet set-address' first")]
    WalletNotConnected,

    #[error("Unknown proposal: {0}")]
    UnknownProposal(String),

    #[error("Proposal {0} is not confirmed on-chain yet")]
    NotConfirmed(String),

    #[error("Address {voter} has already voted on proposal {id}")]
    AlreadyVoted { id: u64, voter: String },

    #[error("Voting on proposal {0} has closed")]
    VotingClosed(u64),

    #[error("Action not eligible: {}", .reasons.join("; "))]
    NotEligible { reasons: Vec<String> },

    #[error("Backend has not indexed proposal {0} yet")]
    NotIndexed(u64),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GovernanceError {
    /// True for failures worth retrying on the same inputs.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GovernanceError::Transport(_) | GovernanceError::NotIndexed(_)
        )
    }

    /// True for preconditions that failed before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GovernanceError::EmptyDescription
                | GovernanceError::WalletNotConnected
                | GovernanceError::UnknownProposal(_)
                | GovernanceError::NotConfirmed(_)
                | GovernanceError::AlreadyVoted { .. }
                | GovernanceError::VotingClosed(_)
        )
    }
}
