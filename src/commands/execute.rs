use anyhow::Result;
use colored::Colorize;

use agora::errors::GovernanceError;
use agora::session::Session;

/// Execute a passed proposal. Eligibility is checked locally before any
/// transaction leaves the machine.
pub async fn execute(id: u64) -> Result<()> {
    let session = Session::connect().await?;

    if let Err(e) = session.engine.refresh_from_chain(id).await {
        println!("{}", format!("⚠ Chain read failed: {e}").dimmed());
    }
    if session.engine.proposal(id).is_none() {
        if let Err(e) = session.engine.sync_backend().await {
            println!("{}", format!("⚠ Backend sync failed: {e}").dimmed());
        }
    }

    println!("{}", format!("Executing proposal #{id}...").bright_cyan());

    match session.actions.execute(id).await {
        Ok(receipt) => {
            println!("{}", "✅ Proposal executed!".bright_green());
            println!("  Transaction: {}", receipt.tx_hash.bright_yellow());
            if !receipt.confirmed {
                println!(
                    "{}",
                    "⚠ Backend has not indexed the execution yet.".yellow()
                );
            }
            Ok(())
        }
        Err(GovernanceError::NotEligible { reasons }) => {
            println!("{}", "❌ Proposal cannot be executed:".bright_red());
            for reason in &reasons {
                println!("  • {reason}");
            }
            Err(GovernanceError::NotEligible { reasons }.into())
        }
        Err(e) => {
            println!("{}", "❌ Execution failed".bright_red());
            println!("  Error: {e}");
            Err(e.into())
        }
    }
}
