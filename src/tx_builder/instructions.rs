//! Launchpad instruction assembly and ordering validation
//!
//! Builds the ordered instruction lists for create, buy and sell:
//! 1. Associated token account creation (only when the user's account is missing)
//! 2. Launchpad instruction (create and/or buy, or sell)
//! 3. Priority fee (appended by [`BuiltTransaction::with_priority_fee`])
//!
//! The trade instruction depends on the token account existing, so the
//! order is a correctness requirement. [`sanity_check_ix_order`] enforces it.
//!
//! [`BuiltTransaction::with_priority_fee`]: crate::tx_builder::BuiltTransaction::with_priority_fee

use borsh::BorshSerialize;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use tracing::debug;

use crate::addresses::AddressDeriver;
use crate::chain::{AccountRead, ChainReader};
use crate::curve::{TradeQuote, TradeSide};
use crate::errors::TradeError;

/// Anchor `sighash("global", "create")`
pub const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
/// Anchor `sighash("global", "buy")`
pub const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
/// Anchor `sighash("global", "sell")`
pub const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];

/// `ComputeBudgetInstruction::SetComputeUnitPrice` tag
const SET_COMPUTE_UNIT_PRICE_TAG: u8 = 3;

// Metaplex metadata limits
const MAX_NAME_LEN: usize = 32;
const MAX_SYMBOL_LEN: usize = 10;
const MAX_URI_LEN: usize = 200;

#[derive(BorshSerialize)]
struct CreateArgs<'a> {
    name: &'a str,
    symbol: &'a str,
    uri: &'a str,
}

#[derive(BorshSerialize)]
struct BuyArgs {
    amount: u64,
    max_sol_cost: u64,
}

#[derive(BorshSerialize)]
struct SellArgs {
    amount: u64,
    min_sol_output: u64,
}

/// Name, symbol and metadata URI of a new token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
        }
    }

    fn validate(&self) -> Result<(), TradeError> {
        let checks = [
            ("name", &self.name, MAX_NAME_LEN),
            ("symbol", &self.symbol, MAX_SYMBOL_LEN),
            ("uri", &self.uri, MAX_URI_LEN),
        ];
        for (field, value, max) in checks {
            if value.is_empty() {
                return Err(TradeError::invalid_parameter(format!(
                    "token {} must not be empty",
                    field
                )));
            }
            if value.len() > max {
                return Err(TradeError::invalid_parameter(format!(
                    "token {} is {} bytes, limit is {}",
                    field,
                    value.len(),
                    max
                )));
            }
        }
        Ok(())
    }
}

fn encode<T: BorshSerialize>(discriminator: [u8; 8], args: &T) -> Result<Vec<u8>, TradeError> {
    let mut data = Vec::with_capacity(8 + 32);
    data.extend_from_slice(&discriminator);
    args.serialize(&mut data)
        .map_err(|e| TradeError::instruction_failed("pump", format!("serialize args: {}", e)))?;
    Ok(data)
}

/// Priority fee: compute unit price in micro-lamports
pub fn priority_fee_instruction(micro_lamports: u64) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_price(micro_lamports)
}

pub(crate) fn is_priority_fee(ix: &Instruction) -> bool {
    ix.program_id == compute_budget::id() && ix.data.first() == Some(&SET_COMPUTE_UNIT_PRICE_TAG)
}

/// Builds launchpad instructions from derived addresses
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionBuilder {
    deriver: AddressDeriver,
}

impl InstructionBuilder {
    pub fn new(deriver: AddressDeriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    fn program(&self) -> Pubkey {
        self.deriver.program_ids().trading_program
    }

    /// `create(name, symbol, uri)`; the mint and the user both sign
    pub fn create_instruction(
        &self,
        mint: &Pubkey,
        user: &Pubkey,
        metadata: &TokenMetadata,
    ) -> Result<Instruction, TradeError> {
        metadata.validate()?;

        let ids = self.deriver.program_ids();
        let data = encode(
            CREATE_DISCRIMINATOR,
            &CreateArgs {
                name: &metadata.name,
                symbol: &metadata.symbol,
                uri: &metadata.uri,
            },
        )?;

        let accounts = vec![
            AccountMeta::new(*mint, true),
            AccountMeta::new_readonly(self.deriver.mint_authority().address, false),
            AccountMeta::new(self.deriver.bonding_curve(mint).address, false),
            AccountMeta::new(self.deriver.associated_bonding_curve(mint).address, false),
            AccountMeta::new_readonly(self.deriver.global().address, false),
            AccountMeta::new_readonly(ids.metadata_program, false),
            AccountMeta::new(self.deriver.metadata(mint).address, false),
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(ids.token_program, false),
            AccountMeta::new_readonly(ids.associated_token_program, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(self.deriver.event_authority().address, false),
            AccountMeta::new_readonly(self.program(), false),
        ];

        Ok(Instruction {
            program_id: self.program(),
            accounts,
            data,
        })
    }

    /// `buy(amount, max_sol_cost)`
    pub fn buy_instruction(
        &self,
        mint: &Pubkey,
        user: &Pubkey,
        fee_recipient: &Pubkey,
        quote: &TradeQuote,
    ) -> Result<Instruction, TradeError> {
        if quote.side != TradeSide::Buy {
            return Err(TradeError::instruction_failed("pump", "buy needs a buy quote"));
        }
        if quote.amount == 0 || quote.limit == 0 {
            return Err(TradeError::invalid_parameter(format!(
                "buy amount and max cost must be > 0 (amount={}, max_sol_cost={})",
                quote.amount, quote.limit
            )));
        }

        let ids = self.deriver.program_ids();
        let data = encode(
            BUY_DISCRIMINATOR,
            &BuyArgs {
                amount: quote.amount,
                max_sol_cost: quote.limit,
            },
        )?;

        let accounts = vec![
            AccountMeta::new_readonly(self.deriver.global().address, false),
            AccountMeta::new(*fee_recipient, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(self.deriver.bonding_curve(mint).address, false),
            AccountMeta::new(self.deriver.associated_bonding_curve(mint).address, false),
            AccountMeta::new(self.deriver.associated_token(mint, user).address, false),
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(ids.token_program, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(self.deriver.event_authority().address, false),
            AccountMeta::new_readonly(self.program(), false),
        ];

        Ok(Instruction {
            program_id: self.program(),
            accounts,
            data,
        })
    }

    /// `sell(amount, min_sol_output)`
    pub fn sell_instruction(
        &self,
        mint: &Pubkey,
        user: &Pubkey,
        fee_recipient: &Pubkey,
        quote: &TradeQuote,
    ) -> Result<Instruction, TradeError> {
        if quote.side != TradeSide::Sell {
            return Err(TradeError::instruction_failed("pump", "sell needs a sell quote"));
        }
        if quote.amount == 0 {
            return Err(TradeError::invalid_parameter("sell amount must be > 0"));
        }

        let ids = self.deriver.program_ids();
        let data = encode(
            SELL_DISCRIMINATOR,
            &SellArgs {
                amount: quote.amount,
                min_sol_output: quote.limit,
            },
        )?;

        let accounts = vec![
            AccountMeta::new_readonly(self.deriver.global().address, false),
            AccountMeta::new(*fee_recipient, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(self.deriver.bonding_curve(mint).address, false),
            AccountMeta::new(self.deriver.associated_bonding_curve(mint).address, false),
            AccountMeta::new(self.deriver.associated_token(mint, user).address, false),
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(ids.associated_token_program, false),
            AccountMeta::new_readonly(ids.token_program, false),
            AccountMeta::new_readonly(self.deriver.event_authority().address, false),
            AccountMeta::new_readonly(self.program(), false),
        ];

        Ok(Instruction {
            program_id: self.program(),
            accounts,
            data,
        })
    }

    /// Idempotent creation of the user's token account, paid by the user
    pub fn create_user_token_account(&self, mint: &Pubkey, user: &Pubkey) -> Instruction {
        create_associated_token_account_idempotent(
            user,
            user,
            mint,
            &self.deriver.program_ids().token_program,
        )
    }

    /// Creation instruction if the user's token account is missing
    ///
    /// `NotFound` is expected and becomes an instruction; read failures propagate.
    pub async fn ensure_token_account(
        &self,
        reader: &dyn ChainReader,
        mint: &Pubkey,
        user: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Instruction>, TradeError> {
        let ata = self.deriver.associated_token(mint, user).address;

        match reader.get_account_data(&ata, commitment).await? {
            AccountRead::Found(_) => Ok(None),
            AccountRead::NotFound => {
                debug!(%mint, %user, %ata, "User token account missing, prepending creation");
                Ok(Some(self.create_user_token_account(mint, user)))
            }
        }
    }

    pub fn build_create(
        &self,
        mint: &Pubkey,
        user: &Pubkey,
        metadata: &TokenMetadata,
    ) -> Result<Vec<Instruction>, TradeError> {
        Ok(vec![self.create_instruction(mint, user, metadata)?])
    }

    pub async fn build_buy(
        &self,
        reader: &dyn ChainReader,
        mint: &Pubkey,
        user: &Pubkey,
        fee_recipient: &Pubkey,
        quote: &TradeQuote,
        commitment: CommitmentConfig,
    ) -> Result<Vec<Instruction>, TradeError> {
        let buy_ix = self.buy_instruction(mint, user, fee_recipient, quote)?;

        let mut instructions = Vec::with_capacity(2);
        if let Some(create_ata) = self.ensure_token_account(reader, mint, user, commitment).await? {
            instructions.push(create_ata);
        }
        instructions.push(buy_ix);
        Ok(instructions)
    }

    /// Buy for a mint created in the same transaction
    ///
    /// The mint does not exist yet, so neither does the user's token
    /// account; no chain read is needed.
    pub fn build_buy_after_create(
        &self,
        mint: &Pubkey,
        user: &Pubkey,
        fee_recipient: &Pubkey,
        quote: &TradeQuote,
    ) -> Result<Vec<Instruction>, TradeError> {
        Ok(vec![
            self.create_user_token_account(mint, user),
            self.buy_instruction(mint, user, fee_recipient, quote)?,
        ])
    }

    pub async fn build_sell(
        &self,
        reader: &dyn ChainReader,
        mint: &Pubkey,
        user: &Pubkey,
        fee_recipient: &Pubkey,
        quote: &TradeQuote,
        commitment: CommitmentConfig,
    ) -> Result<Vec<Instruction>, TradeError> {
        let sell_ix = self.sell_instruction(mint, user, fee_recipient, quote)?;

        let mut instructions = Vec::with_capacity(2);
        if let Some(create_ata) = self.ensure_token_account(reader, mint, user, commitment).await? {
            instructions.push(create_ata);
        }
        instructions.push(sell_ix);
        Ok(instructions)
    }
}

/// Validate instruction ordering
///
/// Expected order:
/// 1. Token launch (optional; the mint must exist before its token
///    accounts)
/// 2. Associated token account creation (optional, any number)
/// 3. Buy or sell instructions
/// 4. Exactly one priority fee instruction, last
///
/// # Errors
///
/// Returns `TradeError::InvalidInstructionOrder` if:
/// - Instruction list is empty
/// - The priority fee is missing, duplicated or not last
/// - Account creation or a token launch follows a buy or sell
/// - There is no launchpad instruction
/// - An instruction targets an unexpected program
pub fn sanity_check_ix_order(
    instructions: &[Instruction],
    deriver: &AddressDeriver,
) -> Result<(), TradeError> {
    let ids = deriver.program_ids();

    let Some((last, body)) = instructions.split_last() else {
        return Err(TradeError::invalid_order("Instruction list is empty"));
    };

    if !is_priority_fee(last) {
        return Err(TradeError::invalid_order(format!(
            "Last instruction must be the priority fee, got program_id: {}",
            last.program_id
        )));
    }

    let mut seen_launchpad = false;
    let mut seen_trade = false;
    for (idx, ix) in body.iter().enumerate() {
        if ix.program_id == compute_budget::id() {
            return Err(TradeError::invalid_order(format!(
                "Compute budget instruction at position {} (only one allowed, last)",
                idx
            )));
        } else if ix.program_id == ids.associated_token_program {
            if seen_trade {
                return Err(TradeError::invalid_order(format!(
                    "Token account creation at position {} follows a trade instruction",
                    idx
                )));
            }
        } else if ix.program_id == ids.trading_program {
            seen_launchpad = true;
            if ix.data.starts_with(&CREATE_DISCRIMINATOR) {
                if seen_trade {
                    return Err(TradeError::invalid_order(format!(
                        "Token launch at position {} follows a trade instruction",
                        idx
                    )));
                }
            } else {
                seen_trade = true;
            }
        } else {
            return Err(TradeError::invalid_order(format!(
                "Unexpected program {} at position {}",
                ix.program_id, idx
            )));
        }
    }

    if !seen_launchpad {
        return Err(TradeError::invalid_order("No launchpad instruction found"));
    }

    Ok(())
}
