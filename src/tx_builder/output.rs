//! Built (unsigned) transaction handed to the pipeline
//!
//! A `BuiltTransaction` owns the ordered instruction list and the set of
//! keys that must sign it. It is consumed by [`simulate`], after which the
//! message is frozen inside a [`SimulatedTransaction`].
//!
//! [`simulate`]: crate::tx_builder::TxPipeline::simulate
//! [`SimulatedTransaction`]: crate::tx_builder::SimulatedTransaction

use solana_sdk::{instruction::Instruction, native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};
use std::fmt;

use crate::addresses::AddressDeriver;
use crate::errors::TradeError;
use crate::tx_builder::instructions::{is_priority_fee, priority_fee_instruction, sanity_check_ix_order};

/// Which high-level operation produced a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeKind {
    CreateAndBuy,
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::CreateAndBuy => "create_and_buy",
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered instructions plus the keys that must sign them
///
/// The payer is always the first required signer and the fee payer.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    kind: TradeKind,
    instructions: Vec<Instruction>,
    payer: Pubkey,
    required_signers: Vec<Pubkey>,
}

impl BuiltTransaction {
    pub fn new(kind: TradeKind, payer: Pubkey, instructions: Vec<Instruction>) -> Self {
        Self {
            kind,
            instructions,
            payer,
            required_signers: vec![payer],
        }
    }

    /// Require an additional signer (the mint keypair on create)
    pub fn with_signer(mut self, signer: Pubkey) -> Self {
        if !self.required_signers.contains(&signer) {
            self.required_signers.push(signer);
        }
        self
    }

    /// Append the priority fee instruction
    ///
    /// `micro_lamports = floor(priority_fee_sol * 1e9)`. A zero fee still
    /// appends the instruction so every transaction has the same shape.
    pub fn with_priority_fee(mut self, priority_fee_sol: f64) -> Result<Self, TradeError> {
        if !priority_fee_sol.is_finite() || priority_fee_sol < 0.0 {
            return Err(TradeError::invalid_parameter(format!(
                "priority fee must be a non-negative number, got {}",
                priority_fee_sol
            )));
        }
        if self.instructions.iter().any(is_priority_fee) {
            return Err(TradeError::invalid_order("Priority fee already attached"));
        }

        let micro_lamports = (priority_fee_sol * LAMPORTS_PER_SOL as f64).floor();
        if micro_lamports > u64::MAX as f64 {
            return Err(TradeError::invalid_parameter(format!(
                "priority fee {} overflows micro-lamports",
                priority_fee_sol
            )));
        }

        self.instructions
            .push(priority_fee_instruction(micro_lamports as u64));
        Ok(self)
    }

    pub fn kind(&self) -> TradeKind {
        self.kind
    }

    pub fn payer(&self) -> &Pubkey {
        &self.payer
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }

    /// Check ordering before anything touches the network
    pub fn validate(&self, deriver: &AddressDeriver) -> Result<(), TradeError> {
        sanity_check_ix_order(&self.instructions, deriver)
    }
}
