use anyhow::Result;
use colored::Colorize;

use agora::amount::format_units;
use agora::session::Session;
use agora::types::ProposalStatus;

/// Show session status: DAO parameters, wallet identity, proposal counts.
pub async fn execute() -> Result<()> {
    let session = Session::connect().await?;

    println!("{}", "Agora Session Status".bright_cyan().bold());
    println!();
    println!("{}", "═══ Endpoints ═══".bright_cyan());
    println!("  Backend:    {}", session.config.backend_url);
    println!("  RPC bridge: {}", session.config.rpc_url);
    println!();

    println!("{}", "═══ Wallet ═══".bright_cyan());
    if session.wallet_connected() {
        println!("  Address: {}", session.caller.to_string().bright_yellow());
        let is_owner = session.caller == session.params.owner;
        println!(
            "  Role:    {}",
            if is_owner { "DAO owner".bright_green() } else { "member".normal() }
        );
    } else {
        println!("  {}", "Not connected (read-only session)".yellow());
    }
    println!();

    let decimals = session.config.token_decimals;
    println!("{}", "═══ DAO Parameters ═══".bright_cyan());
    println!("  Owner:            {}", session.params.owner.to_string().bright_yellow());
    println!(
        "  Quorum threshold: {}",
        format_units(&session.params.quorum_threshold, decimals).bright_white()
    );
    println!(
        "  Vote duration:    {} seconds (~{} hours)",
        session.params.vote_duration_secs,
        session.params.vote_duration_secs / 3600
    );
    println!();

    match session.engine.sync_backend().await {
        Ok(_) => {
            let proposals = session.engine.snapshot();
            let count_of = |status: ProposalStatus| {
                proposals.iter().filter(|p| p.status == status).count()
            };
            println!("{}", "═══ Proposals ═══".bright_cyan());
            println!("  Total:     {}", proposals.len().to_string().bright_white());
            println!("  Confirmed: {}", count_of(ProposalStatus::Confirmed));
            println!("  Executed:  {}", count_of(ProposalStatus::Executed));
            println!("  Finalized: {}", count_of(ProposalStatus::Finalized));
        }
        Err(e) => {
            println!("{}", format!("⚠ Backend sync failed: {e}").yellow());
        }
    }

    Ok(())
}
