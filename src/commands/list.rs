use anyhow::Result;
use colored::Colorize;

use agora::amount::format_units;
use agora::session::Session;

/// List proposals, newest first.
pub async fn execute() -> Result<()> {
    let session = Session::connect().await?;

    println!("{}", "Syncing proposals...".dimmed());
    match session.engine.sync_backend().await {
        Ok(count) => println!("{}", format!("✓ {count} proposals synced").green()),
        Err(e) => println!(
            "{}",
            format!("⚠ Backend sync failed: {e} (showing last-known view)").yellow()
        ),
    }
    println!();

    let proposals = session.engine.snapshot();
    if proposals.is_empty() {
        println!("No proposals found.");
        return Ok(());
    }

    let decimals = session.config.token_decimals;
    println!(
        "{}",
        format!(
            "{:<6} {:<10} {:>16} {:>16}  DESCRIPTION",
            "ID", "STATUS", "FOR", "AGAINST"
        )
        .bright_cyan()
    );
    for p in proposals {
        let id = p
            .id
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<10} {:>16} {:>16}  {}",
            id.bright_white(),
            p.status.to_string(),
            format_units(p.votes_for(), decimals),
            format_units(p.votes_against(), decimals),
            truncate(&p.description, 48)
        );
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
