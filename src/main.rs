//! Pump Trader CLI
//!
//! Thin command-line front end over the library: create a token and buy
//! into it, buy an existing token, or sell. Prints the confirmed signature.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use solana_sdk::{pubkey::Pubkey, signature::Signer};
use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pump_trader::config::Config;
use pump_trader::wallet::{load_or_generate_mint, WalletManager};
use pump_trader::{ConfirmedTrade, PumpTrader, SellLimit, TokenMetadata};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs and the result as JSON
    #[arg(long)]
    json: bool,

    /// Override rpc.endpoint
    #[arg(long, env = "PUMP_RPC_URL")]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new token and buy into it
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        /// Metadata JSON URI
        #[arg(long)]
        uri: String,
        /// SOL to spend on the initial buy
        #[arg(long)]
        buy_sol: f64,
        /// Mint keypair file; a fresh mint is generated if omitted
        #[arg(long)]
        mint_keypair: Option<String>,
        #[arg(long)]
        priority_fee_sol: Option<f64>,
        #[arg(long)]
        slippage: Option<f64>,
    },
    /// Buy an existing token
    Buy {
        #[arg(long)]
        mint: String,
        #[arg(long)]
        sol: f64,
        #[arg(long)]
        priority_fee_sol: Option<f64>,
        #[arg(long)]
        slippage: Option<f64>,
    },
    /// Sell token base units; one proceeds bound is required
    #[command(group(
        ArgGroup::new("sell_limit")
            .required(true)
            .args(["min_sol_output", "price_sol"])
    ))]
    Sell {
        #[arg(long)]
        mint: String,
        /// Amount in token base units
        #[arg(long)]
        amount: u64,
        /// Minimum lamports to receive
        #[arg(long)]
        min_sol_output: Option<u64>,
        /// SOL price per whole token, bounded by --slippage
        #[arg(long, requires = "slippage")]
        price_sol: Option<f64>,
        #[arg(long)]
        slippage: Option<f64>,
        #[arg(long)]
        priority_fee_sol: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.json)?;

    let mut config = load_config(&args.config)?;
    if let Some(endpoint) = &args.rpc_url {
        config.rpc.endpoint = endpoint.clone();
    }
    config.validate().context("Invalid configuration")?;

    let wallet =
        WalletManager::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?;
    info!(wallet = %wallet.pubkey(), endpoint = %config.rpc.endpoint, "Wallet loaded");

    let trader = PumpTrader::from_config(&config)?;
    let fee = |v: Option<f64>| v.unwrap_or(config.trading.default_priority_fee_sol);
    let slip = |v: Option<f64>| v.unwrap_or(config.trading.default_slippage);

    let trade = match args.command {
        Command::Create {
            name,
            symbol,
            uri,
            buy_sol,
            mint_keypair,
            priority_fee_sol,
            slippage,
        } => {
            let mint = load_or_generate_mint(mint_keypair.as_deref())?;
            info!(mint = %mint.pubkey(), "Creating token");
            let metadata = TokenMetadata::new(name, symbol, uri);
            trader
                .create_and_buy(
                    wallet.keypair(),
                    &mint,
                    &metadata,
                    buy_sol,
                    fee(priority_fee_sol),
                    slip(slippage),
                )
                .await?
        }
        Command::Buy {
            mint,
            sol,
            priority_fee_sol,
            slippage,
        } => {
            let mint = parse_mint(&mint)?;
            trader
                .buy(wallet.keypair(), &mint, sol, fee(priority_fee_sol), slip(slippage))
                .await?
        }
        Command::Sell {
            mint,
            amount,
            min_sol_output,
            price_sol,
            slippage,
            priority_fee_sol,
        } => {
            let mint = parse_mint(&mint)?;
            let limit = sell_limit(min_sol_output, price_sol, slip(slippage))?;
            trader
                .sell(wallet.keypair(), &mint, amount, limit, fee(priority_fee_sol))
                .await?
        }
    };

    print_trade(&trade, args.json)
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "pump_trader=debug,info"
    } else {
        "pump_trader=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Clap guarantees exactly one bound is present
fn sell_limit(min_sol_output: Option<u64>, price_sol: Option<f64>, slippage: f64) -> Result<SellLimit> {
    match (min_sol_output, price_sol) {
        (Some(lamports), None) => Ok(SellLimit::MinSolOutput(lamports)),
        (None, Some(price)) => Ok(SellLimit::FromPrice {
            sol_price_per_token: price,
            slippage,
        }),
        _ => anyhow::bail!("Exactly one of --min-sol-output or --price-sol is required"),
    }
}

fn parse_mint(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("Invalid mint address: {}", value))
}

fn print_trade(trade: &ConfirmedTrade, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "kind": trade.kind.as_str(),
            "signature": trade.signature.to_string(),
            "slot": trade.slot,
            "units_consumed": trade.units_consumed,
            "created_token_account": trade.created_token_account,
        });
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!("{}", trade.signature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_buy_command() {
        let args = Args::try_parse_from([
            "pump-trader",
            "buy",
            "--mint",
            "So11111111111111111111111111111111111111112",
            "--sol",
            "0.5",
        ])
        .unwrap();
        assert_eq!(args.config, "config.toml");
        assert!(matches!(args.command, Command::Buy { sol, .. } if sol == 0.5));
    }

    #[test]
    fn test_sell_limit_flags_conflict() {
        let result = Args::try_parse_from([
            "pump-trader",
            "sell",
            "--mint",
            "So11111111111111111111111111111111111111112",
            "--amount",
            "1000",
            "--min-sol-output",
            "10",
            "--price-sol",
            "0.1",
            "--slippage",
            "0.1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sell_requires_a_bound() {
        let result = Args::try_parse_from([
            "pump-trader",
            "sell",
            "--mint",
            "So11111111111111111111111111111111111111112",
            "--amount",
            "1000",
        ]);
        assert!(result.is_err());

        let args = Args::try_parse_from([
            "pump-trader",
            "sell",
            "--mint",
            "So11111111111111111111111111111111111111112",
            "--amount",
            "1000",
            "--min-sol-output",
            "10",
        ])
        .unwrap();
        match args.command {
            Command::Sell {
                min_sol_output,
                price_sol,
                ..
            } => {
                let limit = sell_limit(min_sol_output, price_sol, 0.05).unwrap();
                assert_eq!(limit, SellLimit::MinSolOutput(10));
            }
            other => panic!("Expected sell, got {other:?}"),
        }
        assert!(sell_limit(None, None, 0.05).is_err());
    }

    #[test]
    fn test_parse_mint() {
        assert!(parse_mint("So11111111111111111111111111111111111111112").is_ok());
        assert!(parse_mint("not-a-key").is_err());
    }
}
