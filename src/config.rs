//! Configuration module for the pump trader
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.
//! Program ids live here as plain strings and are parsed once into
//! [`ProgramIds`] which is then injected into the address deriver.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;

use crate::addresses::{ProgramIds, METADATA_PROGRAM_ID, PLATFORM_FEE_RECIPIENT, PUMP_PROGRAM_ID};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Launchpad program addresses
    #[serde(default)]
    pub programs: ProgramConfig,

    /// Trading defaults
    #[serde(default)]
    pub trading: TradingConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Commitment for reads, simulation and confirmation
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Upper bound on the confirmation wait in seconds
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Signature status polling interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    #[serde(default = "default_trading_program")]
    pub trading_program: String,

    #[serde(default = "default_metadata_program")]
    pub metadata_program: String,

    /// Used when the global account carries no fee recipient
    #[serde(default = "default_fee_recipient")]
    pub platform_fee_recipient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Default priority fee in SOL (converted to micro-lamports per CU as `fee * 1e9`)
    #[serde(default = "default_priority_fee")]
    pub default_priority_fee_sol: f64,

    /// Default slippage as a decimal fraction in [0, 1)
    #[serde(default = "default_slippage")]
    pub default_slippage: f64,

    /// Commitment used when reading the global reserve account
    #[serde(default = "default_snapshot_commitment")]
    pub snapshot_commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

// Default value functions
fn default_endpoint() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_confirm_timeout() -> u64 { 60 }
fn default_poll_interval() -> u64 { 500 }
fn default_trading_program() -> String { PUMP_PROGRAM_ID.to_string() }
fn default_metadata_program() -> String { METADATA_PROGRAM_ID.to_string() }
fn default_fee_recipient() -> String { PLATFORM_FEE_RECIPIENT.to_string() }
fn default_priority_fee() -> f64 { 0.000_01 }
fn default_slippage() -> f64 { 0.05 }
fn default_snapshot_commitment() -> String { "finalized".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            commitment: default_commitment(),
            confirm_timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            trading_program: default_trading_program(),
            metadata_program: default_metadata_program(),
            platform_fee_recipient: default_fee_recipient(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_priority_fee_sol: default_priority_fee(),
            default_slippage: default_slippage(),
            snapshot_commitment: default_snapshot_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

/// Parse a commitment level name
pub fn parse_commitment(level: &str) -> Option<CommitmentConfig> {
    match level {
        "processed" => Some(CommitmentConfig::processed()),
        "confirmed" => Some(CommitmentConfig::confirmed()),
        "finalized" => Some(CommitmentConfig::finalized()),
        _ => None,
    }
}

impl RpcConfig {
    /// Commitment for this endpoint; unknown names fall back to `confirmed`
    pub fn commitment_config(&self) -> CommitmentConfig {
        parse_commitment(&self.commitment).unwrap_or_else(CommitmentConfig::confirmed)
    }
}

impl TradingConfig {
    pub fn snapshot_commitment_config(&self) -> CommitmentConfig {
        parse_commitment(&self.snapshot_commitment).unwrap_or_else(CommitmentConfig::finalized)
    }
}

impl ProgramConfig {
    /// Parse the configured addresses
    pub fn program_ids(&self) -> anyhow::Result<ProgramIds> {
        let parse = |field: &str, value: &str| {
            Pubkey::from_str(value).with_context(|| format!("Invalid {} address: {}", field, value))
        };

        Ok(ProgramIds {
            trading_program: parse("trading_program", &self.trading_program)?,
            metadata_program: parse("metadata_program", &self.metadata_program)?,
            platform_fee_recipient: parse("platform_fee_recipient", &self.platform_fee_recipient)?,
            ..ProgramIds::default()
        })
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `PUMP_RPC_URL` and `PUMP_KEYPAIR_PATH` if set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("PUMP_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Ok(path) = std::env::var("PUMP_KEYPAIR_PATH") {
            self.wallet.keypair_path = path;
        }
    }

    /// Reject values the pipeline would refuse at call time anyway
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.endpoint.is_empty() {
            bail!("rpc.endpoint must not be empty");
        }
        if parse_commitment(&self.rpc.commitment).is_none() {
            bail!("Unknown rpc.commitment: {}", self.rpc.commitment);
        }
        if parse_commitment(&self.trading.snapshot_commitment).is_none() {
            bail!(
                "Unknown trading.snapshot_commitment: {}",
                self.trading.snapshot_commitment
            );
        }
        let slippage = self.trading.default_slippage;
        if !slippage.is_finite() || !(0.0..1.0).contains(&slippage) {
            bail!("trading.default_slippage must be in [0, 1), got {}", slippage);
        }
        let fee = self.trading.default_priority_fee_sol;
        if !fee.is_finite() || fee < 0.0 {
            bail!("trading.default_priority_fee_sol must be >= 0, got {}", fee);
        }
        self.programs.program_ids()?;
        Ok(())
    }
}
