use crate::types::{Address, DaoParams, Proposal, ProposalStatus};

/// Result of an eligibility evaluation. `reasons` enumerates every unmet
/// rule, not just the first, so the caller can explain exactly why an action
/// is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub can_execute: bool,
    pub can_finalize: bool,
    pub reasons: Vec<String>,
}

/// Decide whether `caller` may execute or finalize `proposal` at time `now`
/// (unix seconds).
///
/// Pure function of its inputs. `chain_quorum` carries the contract's own
/// `hasQuorum` answer when a fresh one is available; being the consistency
/// checkpoint, it takes precedence over the locally summed total.
///
/// Execute requires an elapsed vote window, an unexecuted proposal, a strict
/// for-majority (ties never pass), quorum, and the DAO owner as caller.
/// Finalize closes a defeated proposal: elapsed window, non-terminal status,
/// and no for-majority.
pub fn evaluate(
    proposal: &Proposal,
    params: &DaoParams,
    caller: &Address,
    now: i64,
    chain_quorum: Option<bool>,
) -> Eligibility {
    let mut reasons = Vec::new();

    let window_elapsed = match proposal.vote_window_end(params) {
        Some(end) if now >= end => true,
        Some(end) => {
            reasons.push(format!(
                "voting window is still open (closes at {end}, now {now})"
            ));
            false
        }
        None => {
            reasons.push("voting window is not known yet (creation time unconfirmed)".to_string());
            false
        }
    };

    let executed = proposal.status == ProposalStatus::Executed;
    if executed {
        reasons.push("proposal has already been executed".to_string());
    }
    let finalized = proposal.status == ProposalStatus::Finalized;
    if finalized {
        reasons.push("proposal has already been finalized".to_string());
    }

    let majority = proposal.votes_for() > proposal.votes_against();
    if !majority {
        reasons.push(format!(
            "no majority: {} for vs {} against",
            proposal.votes_for(),
            proposal.votes_against()
        ));
    }

    let quorum = match chain_quorum {
        Some(met) => {
            if !met {
                reasons.push("chain reports quorum has not been reached".to_string());
            }
            met
        }
        None => {
            let total = proposal.total_votes();
            let met = total >= params.quorum_threshold;
            if !met {
                reasons.push(format!(
                    "quorum not met: total vote weight {} below threshold {}",
                    total, params.quorum_threshold
                ));
            }
            met
        }
    };

    let is_owner = caller == &params.owner;
    if !is_owner {
        reasons.push("caller is not the DAO owner".to_string());
    }

    let can_execute = window_elapsed && !executed && majority && quorum && is_owner;
    let can_finalize = window_elapsed && !executed && !finalized && !majority;

    Eligibility {
        can_execute,
        can_finalize,
        reasons,
    }
}
