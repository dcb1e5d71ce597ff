use anyhow::Result;
use chrono::{TimeZone, Utc};
use colored::Colorize;

use agora::amount::format_units;
use agora::eligibility::evaluate;
use agora::session::Session;
use agora::sources::{BackendReader, ChainReader};

/// Show one proposal in full, including why execute/finalize are currently
/// enabled or disabled.
pub async fn execute(id: u64) -> Result<()> {
    let session = Session::connect().await?;

    if let Err(e) = session.engine.refresh_from_chain(id).await {
        println!("{}", format!("⚠ Chain read failed: {e}").yellow());
    }
    // The backend row carries fields the chain struct does not (creator,
    // executor, finalized flag)
    match session.backend.proposal(id).await {
        Ok(Some(dto)) => session.engine.ingest_dto(dto),
        Ok(None) => {}
        Err(e) => println!("{}", format!("⚠ Backend read failed: {e}").dimmed()),
    }

    let Some(proposal) = session.engine.proposal(id) else {
        anyhow::bail!("Proposal {id} not found on chain or backend");
    };

    let decimals = session.config.token_decimals;
    println!("{}", format!("Proposal #{id}").bright_cyan().bold());
    println!("  Description: {}", proposal.description);
    println!("  Creator:     {}", proposal.creator.to_string().bright_yellow());
    println!("  Status:      {}", proposal.status.to_string().bright_white());
    if let Some(executor) = &proposal.executor {
        println!("  Executor:    {}", executor.to_string().bright_yellow());
    }
    println!(
        "  Votes:       {} for / {} against",
        format_units(proposal.votes_for(), decimals).green(),
        format_units(proposal.votes_against(), decimals).red()
    );
    match proposal.vote_window_end(&session.params) {
        Some(end) => {
            let when = Utc
                .timestamp_opt(end, 0)
                .single()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| end.to_string());
            println!("  Voting ends: {when}");
        }
        None => println!("  Voting ends: unknown (creation time unconfirmed)"),
    }

    let chain_quorum = session.rpc.has_quorum(id).await.ok();
    let eligibility = evaluate(
        &proposal,
        &session.params,
        &session.caller,
        Utc::now().timestamp(),
        chain_quorum,
    );

    println!();
    println!(
        "  Executable:  {}",
        if eligibility.can_execute { "yes".green() } else { "no".red() }
    );
    println!(
        "  Finalizable: {}",
        if eligibility.can_finalize { "yes".green() } else { "no".red() }
    );
    if !eligibility.reasons.is_empty() {
        println!("  Blocked by:");
        for reason in &eligibility.reasons {
            println!("    • {reason}");
        }
    }

    Ok(())
}
