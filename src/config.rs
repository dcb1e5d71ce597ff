use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::amount::DEFAULT_TOKEN_DECIMALS;
use crate::errors::GovernanceError;

/// Configuration for the Agora CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Indexer backend base URL.
    pub backend_url: String,
    /// Wallet signer bridge JSON-RPC URL.
    pub rpc_url: String,
    /// Governance token decimals used for display.
    pub token_decimals: u32,
    /// Bearer token attached to backend calls; obtained out of band through
    /// the nonce-and-signature handshake.
    pub auth_token: Option<String>,
    pub wallet_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:4000".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            auth_token: None,
            wallet_path: None,
        }
    }
}

impl Config {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?;
        Ok(config_dir.join("agora-cli").join("config.toml"))
    }

    /// Load config from the default location, creating it on first use.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    pub fn set_backend_url(&mut self, url: &str) -> Result<()> {
        validate_url(url)?;
        self.backend_url = url.trim_end_matches('/').to_string();
        self.save()?;
        Ok(())
    }

    pub fn set_rpc_url(&mut self, url: &str) -> Result<()> {
        validate_url(url)?;
        self.rpc_url = url.to_string();
        self.save()?;
        Ok(())
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(GovernanceError::Config(format!("invalid URL (expected http(s)): {url}")).into())
    }
}

/// Set the indexer backend URL
pub fn set_backend(url: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set_backend_url(url)?;

    println!("{}", format!("✓ Backend set to: {}", config.backend_url).green());
    Ok(())
}

/// Set the signer bridge RPC URL
pub fn set_rpc(url: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set_rpc_url(url)?;

    println!("{}", format!("✓ RPC bridge set to: {}", config.rpc_url).green());
    Ok(())
}

/// Show current configuration
pub fn show() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Agora CLI Configuration".bright_cyan().bold());
    println!("  Backend URL:     {}", config.backend_url.bright_yellow());
    println!("  RPC bridge URL:  {}", config.rpc_url.bright_yellow());
    println!("  Token decimals:  {}", config.token_decimals);
    println!(
        "  Auth token:      {}",
        if config.auth_token.is_some() { "set" } else { "not set" }
    );
    println!(
        "  Wallet path:     {}",
        config.wallet_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not set".to_string())
    );

    Ok(())
}
