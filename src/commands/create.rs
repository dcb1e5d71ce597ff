use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use agora::session::Session;

/// Create a proposal: optimistic insert, transaction submission, bounded
/// wait for the indexer.
pub async fn execute(description: &str) -> Result<()> {
    let session = Session::connect().await?;

    println!("{}", "Creating proposal...".bright_cyan());
    println!("  Creator: {}", session.caller.to_string().bright_yellow());
    println!();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message("Submitting transaction and waiting for the indexer...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = session.actions.create(description).await;
    spinner.finish_and_clear();

    match result {
        Ok(receipt) => {
            println!("{}", "✅ Proposal submitted!".bright_green());
            println!("  Transaction: {}", receipt.tx_hash.bright_yellow());
            match receipt.proposal_id {
                Some(id) => println!("  Proposal id: {}", id.to_string().bright_white()),
                None => println!("  Proposal id: pending"),
            }
            if !receipt.confirmed {
                println!();
                println!(
                    "{}",
                    "⚠ The backend has not indexed the proposal yet; it will appear shortly."
                        .yellow()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", "❌ Proposal creation failed".bright_red());
            println!("  Error: {e}");
            println!();
            println!("{}", "Troubleshooting:".bright_yellow());
            println!("  • Ensure the signer bridge is running and unlocked");
            println!("  • Check your wallet is connected: agora-cli wallet show");
            println!("  • Verify the RPC URL: agora-cli config show");
            Err(e.into())
        }
    }
}
