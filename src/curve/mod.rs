//! Bonding curve state and pricing
//!
//! - **snapshot**: decode the global reserve account into [`ReserveSnapshot`]
//! - **pricer**: constant-product quotes and slippage bounds

pub mod pricer;
pub mod snapshot;

pub use pricer::{
    max_sol_cost, min_sol_output, quote_buy, quote_sell, quote_tokens_out, sol_to_lamports,
    SellLimit, Slippage, TradeQuote, TradeSide, TOKEN_DECIMALS, TOKEN_UNIT,
};
pub use snapshot::{
    anchor_discriminator, fetch_reserve_snapshot, global_account_discriminator, DecodeError,
    ReserveSnapshot, RESERVE_SNAPSHOT_LEN,
};
