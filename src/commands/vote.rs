use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use agora::errors::GovernanceError;
use agora::session::Session;
use agora::types::VoteChoice;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChoiceArg {
    For,
    Against,
}

impl From<ChoiceArg> for VoteChoice {
    fn from(arg: ChoiceArg) -> Self {
        match arg {
            ChoiceArg::For => VoteChoice::For,
            ChoiceArg::Against => VoteChoice::Against,
        }
    }
}

/// Cast a vote on a proposal.
pub async fn execute(id: u64, choice: ChoiceArg) -> Result<()> {
    let session = Session::connect().await?;
    let choice = VoteChoice::from(choice);

    // Make sure the proposal is in the local view before validating
    if let Err(e) = session.engine.refresh_from_chain(id).await {
        println!("{}", format!("⚠ Chain read failed: {e}").dimmed());
    }
    if session.engine.proposal(id).is_none() {
        if let Err(e) = session.engine.sync_backend().await {
            println!("{}", format!("⚠ Backend sync failed: {e}").dimmed());
        }
    }

    println!("{}", format!("Voting {choice} on proposal #{id}...").bright_cyan());

    match session.actions.vote(id, choice).await {
        Ok(receipt) => {
            println!("{}", "✅ Vote cast!".bright_green());
            println!("  Transaction: {}", receipt.tx_hash.bright_yellow());
            if !receipt.confirmed {
                println!(
                    "{}",
                    "⚠ The backend tally has not caught up yet; the chain has your vote.".yellow()
                );
            }
            Ok(())
        }
        Err(GovernanceError::AlreadyVoted { id, voter }) => {
            println!("{}", "❌ Already voted".bright_red());
            println!("  {voter} has already voted on proposal {id}");
            Err(GovernanceError::AlreadyVoted { id, voter }.into())
        }
        Err(e) => {
            println!("{}", "❌ Vote failed".bright_red());
            println!("  Error: {e}");
            Err(e.into())
        }
    }
}
