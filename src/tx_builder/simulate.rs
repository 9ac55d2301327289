//! Compilation and signing for the simulate and submit stages
//!
//! Simulation runs on a transaction signed by the payer alone (the node
//! is asked not to verify signatures). Submission signs the very same
//! message with every required signer, so what was simulated is what is
//! sent.

use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::errors::TradeError;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::output::{BuiltTransaction, TradeKind};

/// A transaction that passed simulation
///
/// Immutable: the message (instructions, fee payer, blockhash) is frozen
/// here and can only be signed and sent.
#[derive(Debug, Clone)]
pub struct SimulatedTransaction {
    pub(crate) kind: TradeKind,
    pub(crate) transaction: Transaction,
    pub(crate) required_signers: Vec<Pubkey>,
    pub(crate) logs: Vec<String>,
    pub(crate) units_consumed: Option<u64>,
    pub(crate) logger: StructuredLogger,
}

impl SimulatedTransaction {
    pub fn kind(&self) -> TradeKind {
        self.kind
    }

    /// Payer-signed transaction that was simulated
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn recent_blockhash(&self) -> &Hash {
        &self.transaction.message.recent_blockhash
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }

    /// Program logs returned by the simulator
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn units_consumed(&self) -> Option<u64> {
        self.units_consumed
    }

    pub fn context_id(&self) -> &str {
        self.logger.context_id()
    }
}

/// Compile `built` against `blockhash` and sign with the payer only
pub fn compile_for_simulation(
    built: &BuiltTransaction,
    payer: &Keypair,
    blockhash: Hash,
) -> Result<Transaction, TradeError> {
    if payer.pubkey() != *built.payer() {
        return Err(TradeError::Signing(format!(
            "payer keypair {} does not match fee payer {}",
            payer.pubkey(),
            built.payer()
        )));
    }

    let message = Message::new_with_blockhash(built.instructions(), Some(built.payer()), &blockhash);
    let mut tx = Transaction::new_unsigned(message);
    tx.try_partial_sign(&[payer], blockhash)
        .map_err(|e| TradeError::Signing(format!("payer signing failed: {}", e)))?;
    Ok(tx)
}

/// Pick a keypair for every required signer, in message order
pub fn select_signers<'a>(
    required: &[Pubkey],
    provided: &[&'a Keypair],
) -> Result<Vec<&'a Keypair>, TradeError> {
    required
        .iter()
        .map(|key| {
            provided
                .iter()
                .copied()
                .find(|kp| kp.pubkey() == *key)
                .ok_or_else(|| TradeError::Signing(format!("missing signer {}", key)))
        })
        .collect()
}

/// Sign the simulated message with all required signers
pub fn sign_for_submission(
    simulated: &SimulatedTransaction,
    signers: &[&Keypair],
) -> Result<Transaction, TradeError> {
    let keypairs = select_signers(&simulated.required_signers, signers)?;

    let mut tx = simulated.transaction.clone();
    let blockhash = tx.message.recent_blockhash;
    tx.try_sign(keypairs.as_slice(), blockhash)
        .map_err(|e| TradeError::Signing(e.to_string()))?;
    Ok(tx)
}
