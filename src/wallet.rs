//! Wallet management module

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::Path;
use std::sync::Arc;

/// Wallet manager for handling the payer keypair
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

/// Parse a keypair from raw 64 bytes or a JSON byte array
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair> {
    let raw: Vec<u8> = if bytes.len() == 64 {
        bytes.to_vec()
    } else {
        serde_json::from_slice(bytes).context("Failed to parse keypair JSON")?
    };

    if raw.len() != 64 {
        anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", raw.len());
    }
    if raw.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(raw.as_slice()).context("Invalid keypair bytes")
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

/// Read a keypair file
pub fn read_keypair(path: &str) -> Result<Keypair> {
    let path = expand_home(path);
    let bytes = std::fs::read(&path)
        .with_context(|| format!("Failed to read keypair file: {}", path))?;
    keypair_from_bytes(&bytes).with_context(|| format!("Invalid keypair file: {}", path))
}

/// Mint keypair for a new token: loaded from `path` if given, else generated
pub fn load_or_generate_mint(path: Option<&str>) -> Result<Keypair> {
    match path {
        Some(path) if Path::new(&expand_home(path)).exists() => read_keypair(path),
        Some(path) => anyhow::bail!("Mint keypair file not found: {}", path),
        None => Ok(Keypair::new()),
    }
}

impl WalletManager {
    /// Create a new wallet manager from a keypair file
    pub fn from_file(path: &str) -> Result<Self> {
        Ok(Self::from_keypair(read_keypair(path)?))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get a reference to the keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Get an Arc reference to the keypair
    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

impl Clone for WalletManager {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}
