use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::GovernanceError;
use crate::types::Address;

/// Stored wallet identity. Key custody and signing live in the signer
/// bridge; the CLI only needs to know which address it acts as.
#[derive(Debug, Serialize, Deserialize)]
struct WalletFile {
    address: String,
}

/// Connect a wallet address
pub fn set_address(address: &str) -> Result<()> {
    let trimmed = address.trim();
    if !trimmed.starts_with("0x") || trimmed.len() < 4 {
        return Err(anyhow::anyhow!("Invalid address (expected 0x-prefixed): {address}"));
    }

    let normalized = Address::new(trimmed);
    let wallet_path = default_wallet_path()?;

    if let Some(parent) = wallet_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&WalletFile {
        address: normalized.to_string(),
    })?;
    std::fs::write(&wallet_path, json)?;

    println!("{}", "✓ Wallet connected".green());
    println!("  Address: {}", normalized.to_string().bright_yellow());
    println!("  Saved to: {}", wallet_path.display());

    let mut config = Config::load()?;
    config.wallet_path = Some(wallet_path);
    config.save()?;

    Ok(())
}

/// Show wallet address
pub fn show_address() -> Result<()> {
    let address = load_address()?;

    println!("{}", "Wallet Address:".bright_cyan());
    println!("  {}", address.to_string().bright_yellow());

    Ok(())
}

/// Load the connected wallet address from the configured path.
pub fn load_address() -> Result<Address> {
    let config = Config::load()?;

    let wallet_path = config
        .wallet_path
        .unwrap_or(default_wallet_path()?);

    if !wallet_path.exists() {
        return Err(GovernanceError::WalletNotConnected.into());
    }

    let contents = std::fs::read_to_string(&wallet_path)?;
    let wallet: WalletFile =
        serde_json::from_str(&contents).context("Invalid wallet file format")?;

    Ok(Address::new(&wallet.address))
}

fn default_wallet_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?;
    Ok(config_dir.join("agora-cli").join("wallet.json"))
}
