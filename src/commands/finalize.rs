use anyhow::Result;
use colored::Colorize;

use agora::errors::GovernanceError;
use agora::session::Session;

/// Close a defeated proposal without execution.
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

    println!("{}", format!("Finalizing proposal #{id}...").bright_cyan());

    match session.actions.finalize(id).await {
        Ok(receipt) => {
            println!("{}", "✅ Proposal finalized!".bright_green());
            println!("  Transaction: {}", receipt.tx_hash.bright_yellow());
            Ok(())
        }
        Err(GovernanceError::NotEligible { reasons }) => {
            println!("{}", "❌ Proposal cannot be finalized:".bright_red());
            for reason in &reasons {
                println!("  • {reason}");
            }
            Err(GovernanceError::NotEligible { reasons }.into())
        }
        Err(e) => {
            println!("{}", "❌ Finalize failed".bright_red());
            println!("  Error: {e}");
            Err(e.into())
        }
    }
}
