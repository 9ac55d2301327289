//! Transaction building and submission
//!
//! ## Architecture
//!
//! - **instructions**: create / buy / sell instruction assembly and the
//!   ordering check
//! - **output**: [`BuiltTransaction`], the ordered instructions plus signers
//! - **simulate**: compilation and signing for the simulate and submit stages
//! - **builder**: [`TxPipeline`], the typed `Built → Simulated → Submitted →
//!   Confirmed` stages
//!
//! ## Instruction order
//!
//! 1. Associated token account creation (only when missing)
//! 2. Launchpad instructions (create and/or buy, or sell)
//! 3. Priority fee (exactly one, last)
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pump_trader::tx_builder::{BuiltTransaction, TradeKind, TxPipeline};
//! use solana_sdk::signature::Keypair;
//!
//! # async fn example(pipeline: TxPipeline, built: BuiltTransaction, payer: Keypair)
//! #     -> Result<(), pump_trader::TradeError> {
//! let built = built.with_priority_fee(0.00001)?;
//! let trade = pipeline.execute(built, &[&payer]).await?;
//! println!("{} landed in slot {}", trade.signature, trade.slot);
//! # Ok(())
//! # }
//! ```

mod builder;
pub mod instructions;
mod output;
mod simulate;

pub use builder::{ConfirmedTrade, SubmittedTransaction, TxPipeline};
pub use instructions::{
    priority_fee_instruction, sanity_check_ix_order, InstructionBuilder, TokenMetadata,
    BUY_DISCRIMINATOR, CREATE_DISCRIMINATOR, SELL_DISCRIMINATOR,
};
pub use output::{BuiltTransaction, TradeKind};
pub use simulate::{compile_for_simulation, select_signers, SimulatedTransaction};
