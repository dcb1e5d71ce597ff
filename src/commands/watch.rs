use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::warn;

use agora::session::Session;
use agora::sources::EventSource;
use agora::types::ChainEvent;

const EVENT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Stream governance events into the reconciliation engine until
/// interrupted. Event arrival and processing are decoupled through an
/// unbounded channel the engine drains.
pub async fn execute(from: Option<u64>) -> Result<()> {
    let session = Session::connect().await?;

    println!("{}", "Syncing proposals before watching...".dimmed());
    if let Err(e) = session.engine.sync_backend().await {
        println!("{}", format!("⚠ Backend sync failed: {e}").yellow());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let rpc = session.rpc.clone();
    let mut cursor = from.unwrap_or(0);

    tokio::spawn(async move {
        loop {
            match rpc.poll_events(cursor).await {
                Ok((events, next_cursor)) => {
                    cursor = next_cursor;
                    for event in events {
                        print_event(&event);
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => warn!(%error, "event poll failed; retrying"),
            }
            tokio::time::sleep(EVENT_POLL_INTERVAL).await;
        }
    });

    println!("{}", "Watching governance events (ctrl-c to stop)...".bright_cyan());
    session.engine.run_events(rx).await;

    Ok(())
}

fn print_event(event: &ChainEvent) {
    match event {
        ChainEvent::ProposalCreated { id, creator, .. } => {
            println!("{}", format!("● proposal #{id} created by {creator}").green());
        }
        ChainEvent::Voted {
            id, voter, support, ..
        } => {
            let choice = if *support { "for" } else { "against" };
            println!("{}", format!("● vote {choice} on #{id} by {voter}").bright_white());
        }
        ChainEvent::ProposalExecuted { id } => {
            println!("{}", format!("● proposal #{id} executed").bright_green());
        }
    }
}
