//! Test Utilities Module
//!
//! Scriptable in-memory chain collaborators and fixtures for deterministic
//! testing without a network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::collections::HashMap;

use crate::addresses::AddressDeriver;
use crate::chain::{
    AccountRead, ChainError, ChainReader, Confirmation, SimulationOutcome, TransactionSimulator,
    TransactionSubmitter,
};
use crate::curve::{global_account_discriminator, ReserveSnapshot};

/// Fee recipient carried by [`sample_snapshot`]
pub const SAMPLE_FEE_RECIPIENT: Pubkey = Pubkey::new_from_array([7u8; 32]);

/// Global account with round reserves: `Tv = 1e12`, `Sv = 3e10`, `Tr = 8e11`
pub fn sample_snapshot() -> ReserveSnapshot {
    ReserveSnapshot {
        discriminator: global_account_discriminator(),
        initialized: true,
        authority: Pubkey::new_from_array([9u8; 32]),
        fee_recipient: SAMPLE_FEE_RECIPIENT,
        initial_virtual_token_reserves: 1_000_000_000_000,
        initial_virtual_sol_reserves: 30_000_000_000,
        initial_real_token_reserves: 800_000_000_000,
        token_total_supply: 1_000_000_000_000_000,
        fee_basis_points: 100,
    }
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<Pubkey, Vec<u8>>,
    read_failure: Option<String>,
    blockhash_failure: Option<String>,
    simulation: SimulationOutcome,
    simulation_failure: Option<String>,
    send_failure: Option<String>,
    confirmation: Confirmation,
    confirmation_failure: Option<ChainError>,
    reads: Vec<Pubkey>,
    simulated: Vec<Transaction>,
    sent: Vec<Transaction>,
    confirm_calls: usize,
}

/// In-memory chain implementing all three collaborator traits
///
/// Defaults: every account is missing, simulation succeeds, sends are
/// accepted (the signature is the transaction's first signature) and
/// confirmation lands in slot 1 without error.
pub struct MockChain {
    blockhash: Hash,
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            state: Mutex::new(MockState {
                simulation: SimulationOutcome {
                    err: None,
                    logs: vec!["Program log: Instruction: Buy".to_string()],
                    units_consumed: Some(42_000),
                },
                confirmation: Confirmation { slot: 1, err: None },
                ..MockState::default()
            }),
        }
    }

    /// Chain with the global account set to `snapshot`
    pub fn with_global(deriver: &AddressDeriver, snapshot: &ReserveSnapshot) -> Self {
        let chain = Self::new();
        chain.set_account(deriver.global().address, snapshot.to_bytes());
        chain
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state.lock().accounts.insert(address, data);
    }

    /// Every account read fails with a transport error
    pub fn fail_reads(&self, message: &str) {
        self.state.lock().read_failure = Some(message.to_string());
    }

    pub fn fail_blockhash(&self, message: &str) {
        self.state.lock().blockhash_failure = Some(message.to_string());
    }

    /// Simulation completes but reports an execution error
    pub fn set_simulation_error(&self, detail: &str, logs: Vec<String>) {
        let mut state = self.state.lock();
        state.simulation.err = Some(detail.to_string());
        state.simulation.logs = logs;
    }

    /// The simulate call itself fails in transport
    pub fn fail_simulation_transport(&self, message: &str) {
        self.state.lock().simulation_failure = Some(message.to_string());
    }

    pub fn fail_send(&self, message: &str) {
        self.state.lock().send_failure = Some(message.to_string());
    }

    /// Transaction lands but carries an execution error
    pub fn set_confirmation_error(&self, detail: &str) {
        self.state.lock().confirmation.err = Some(detail.to_string());
    }

    pub fn set_confirmation_slot(&self, slot: u64) {
        self.state.lock().confirmation.slot = slot;
    }

    /// Waiting for the verdict fails (timeout, expiry, transport)
    pub fn fail_confirmation(&self, err: ChainError) {
        self.state.lock().confirmation_failure = Some(err);
    }

    pub fn read_addresses(&self) -> Vec<Pubkey> {
        self.state.lock().reads.clone()
    }

    pub fn simulated_transactions(&self) -> Vec<Transaction> {
        self.state.lock().simulated.clone()
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state.lock().sent.clone()
    }

    pub fn simulate_count(&self) -> usize {
        self.state.lock().simulated.len()
    }

    pub fn send_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn confirm_count(&self) -> usize {
        self.state.lock().confirm_calls
    }

    fn transport(message: &str) -> ChainError {
        ChainError::Transport {
            endpoint: "mock://chain".to_string(),
            message: message.to_string(),
        }
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_account_data(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> Result<AccountRead, ChainError> {
        let mut state = self.state.lock();
        state.reads.push(*address);
        if let Some(message) = &state.read_failure {
            return Err(Self::transport(message));
        }
        Ok(match state.accounts.get(address) {
            Some(data) => AccountRead::Found(data.clone()),
            None => AccountRead::NotFound,
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        match &self.state.lock().blockhash_failure {
            Some(message) => Err(Self::transport(message)),
            None => Ok(self.blockhash),
        }
    }
}

#[async_trait]
impl TransactionSimulator for MockChain {
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationOutcome, ChainError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.simulation_failure {
            return Err(Self::transport(message));
        }
        state.simulated.push(tx.clone());
        Ok(state.simulation.clone())
    }
}

#[async_trait]
impl TransactionSubmitter for MockChain {
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ChainError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.send_failure {
            return Err(Self::transport(message));
        }
        // A real node rejects anything not fully and correctly signed
        tx.verify()
            .map_err(|e| Self::transport(&format!("signature verification failed: {}", e)))?;
        state.sent.push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _recent_blockhash: &Hash,
    ) -> Result<Confirmation, ChainError> {
        let mut state = self.state.lock();
        state.confirm_calls += 1;
        if let Some(err) = &state.confirmation_failure {
            return Err(err.clone());
        }
        Ok(state.confirmation.clone())
    }
}
