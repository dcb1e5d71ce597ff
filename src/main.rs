mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agora-cli")]
#[command(author = "Agora Team")]
#[command(version = "0.1.0")]
#[command(about = "CLI client for Agora DAO governance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all proposals (backend-synced, chain-corrected)
    List,

    /// Show one proposal in detail, including execution eligibility
    Show {
        /// On-chain proposal id
        id: u64,
    },

    /// Create a new proposal
    Create {
        /// Proposal description
        #[arg(long)]
        description: String,
    },

    /// Vote on a proposal
    Vote {
        /// On-chain proposal id
        id: u64,

        /// Vote choice
        #[arg(value_enum)]
        choice: commands::vote::ChoiceArg,
    },

    /// Execute a passed proposal (DAO owner only)
    Execute {
        /// On-chain proposal id
        id: u64,
    },

    /// Finalize a defeated proposal
    Finalize {
        /// On-chain proposal id
        id: u64,
    },

    /// Show session status: DAO parameters, wallet, proposal counts
    Status,

    /// Stream governance events and reconcile them live
    Watch {
        /// Event cursor to resume from (defaults to the beginning)
        #[arg(long)]
        from: Option<u64>,
    },

    /// Wallet management commands
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Connect a wallet address
    SetAddress {
        /// 0x-prefixed account address
        address: String,
    },

    /// Show the connected wallet address
    Show,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set the indexer backend URL
    SetBackend {
        /// Base URL, e.g. http://127.0.0.1:4000
        url: String,
    },

    /// Set the wallet signer bridge RPC URL
    SetRpc {
        /// JSON-RPC URL, e.g. http://127.0.0.1:8545
        url: String,
    },

    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            commands::list::execute().await?;
        }
        Commands::Show { id } => {
            commands::show::execute(id).await?;
        }
        Commands::Create { description } => {
            commands::create::execute(&description).await?;
        }
        Commands::Vote { id, choice } => {
            commands::vote::execute(id, choice).await?;
        }
        Commands::Execute { id } => {
            commands::execute::execute(id).await?;
        }
        Commands::Finalize { id } => {
            commands::finalize::execute(id).await?;
        }
        Commands::Status => {
            commands::status::execute().await?;
        }
        Commands::Watch { from } => {
            commands::watch::execute(from).await?;
        }
        Commands::Wallet { action } => match action {
            WalletCommands::SetAddress { address } => agora::wallet::set_address(&address)?,
            WalletCommands::Show => agora::wallet::show_address()?,
        },
        Commands::Config { action } => match action {
            ConfigCommands::SetBackend { url } => agora::config::set_backend(&url)?,
            ConfigCommands::SetRpc { url } => agora::config::set_rpc(&url)?,
            ConfigCommands::Show => agora::config::show()?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verification() {
        // Verifies that the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_has_version() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_version(), Some("0.1.0"));
    }

    #[test]
    fn test_cli_has_about() {
        let cmd = Cli::command();
        assert!(cmd.get_about().is_some());
    }
}
