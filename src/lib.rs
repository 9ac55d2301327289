//! Pump Trader - client for the pump.fun bonding-curve launchpad
//!
//! Creates tokens and buys or sells them against their bonding curve:
//! reads the global reserve account, prices the trade, assembles the
//! ordered instructions, then simulates, submits and confirms.

pub mod addresses;
pub mod chain;
pub mod config;
pub mod curve;
pub mod errors;
pub mod metrics;
pub mod structured_logging;
pub mod test_utils;
pub mod trader;
pub mod tx_builder;
pub mod wallet;

pub use addresses::{AddressDeriver, DerivedAddress, ProgramIds};
pub use chain::{AccountRead, ChainError, ChainReader, RpcChainClient};
pub use curve::{ReserveSnapshot, SellLimit, Slippage, TradeQuote, TradeSide};
pub use errors::TradeError;
pub use trader::{buy, create_and_buy, sell, PumpTrader, TradeSettings};
pub use tx_builder::{BuiltTransaction, ConfirmedTrade, TokenMetadata, TradeKind};

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};

#[cfg(test)]
mod tests;
