//! Chain collaborators consumed by the trading pipeline
//!
//! The pipeline never talks to an RPC node directly. It goes through three
//! narrow traits so tests can script every network outcome:
//! - [`ChainReader`]: account reads and the latest blockhash
//! - [`TransactionSimulator`]: dry-run a transaction
//! - [`TransactionSubmitter`]: send, then wait for the network's verdict
//!
//! [`RpcChainClient`] implements all three over the nonblocking
//! `solana-client` RPC client.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    client_error::Error as ClientError, config::RpcSimulateTransactionConfig,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::RpcConfig;

/// Transport-level failures reported by a chain collaborator
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Network or RPC server failure
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Waited longer than the transport's confirmation bound
    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The transaction's blockhash expired before it was observed on chain
    #[error("Blockhash expired: {blockhash}")]
    BlockhashExpired { blockhash: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChainError {
    /// Transport hiccups that a fresh attempt may not hit again
    pub fn is_transient(&self) -> bool {
        !matches!(self, ChainError::Internal(_))
    }
}

/// Result of reading an account: present with data, or absent
///
/// Transport failures are the `Err` side of the surrounding `Result`, so
/// "does not exist" is never confused with "could not be read".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRead {
    Found(Vec<u8>),
    NotFound,
}

impl AccountRead {
    pub fn exists(&self) -> bool {
        matches!(self, AccountRead::Found(_))
    }
}

/// What a simulation reported
#[derive(Debug, Clone, Default)]
pub struct SimulationOutcome {
    /// Execution error as reported by the node, if any
    pub err: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

/// Network verdict for a submitted transaction
#[derive(Debug, Clone, Default)]
pub struct Confirmation {
    pub slot: u64,
    /// Execution error carried by the confirmed status, if any
    pub err: Option<String>,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<AccountRead, ChainError>;

    async fn latest_blockhash(&self) -> Result<Hash, ChainError>;
}

#[async_trait]
pub trait TransactionSimulator: Send + Sync {
    /// Simulate without signature verification
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationOutcome, ChainError>;
}

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ChainError>;

    /// Block until the network reports an outcome for `signature`
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        recent_blockhash: &Hash,
    ) -> Result<Confirmation, ChainError>;
}

/// All three collaborators over a single RPC endpoint
pub struct RpcChainClient {
    rpc: RpcClient,
    endpoint: String,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcChainClient {
    pub fn new(endpoint: impl Into<String>, commitment: CommitmentConfig) -> Self {
        let endpoint = endpoint.into();
        Self {
            rpc: RpcClient::new_with_commitment(endpoint.clone(), commitment),
            endpoint,
            commitment,
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn from_config(config: &RpcConfig) -> Self {
        let mut client = Self::new(config.endpoint.clone(), config.commitment_config());
        client.confirm_timeout = Duration::from_secs(config.confirm_timeout_secs);
        client.poll_interval = Duration::from_millis(config.poll_interval_ms);
        client
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport(&self, err: ClientError) -> ChainError {
        ChainError::Transport {
            endpoint: self.endpoint.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ChainReader for RpcChainClient {
    async fn get_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<AccountRead, ChainError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, commitment)
            .await
            .map_err(|e| self.transport(e))?;

        Ok(match response.value {
            Some(account) => AccountRead::Found(account.data),
            None => AccountRead::NotFound,
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| self.transport(e))
    }
}

#[async_trait]
impl TransactionSimulator for RpcChainClient {
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationOutcome, ChainError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(self.commitment),
            ..RpcSimulateTransactionConfig::default()
        };

        let response = self
            .rpc
            .simulate_transaction_with_config(tx, config)
            .await
            .map_err(|e| self.transport(e))?;
        let value = response.value;

        Ok(SimulationOutcome {
            err: value.err.map(|e| format!("{:?}", e)),
            logs: value.logs.unwrap_or_default(),
            units_consumed: value.units_consumed,
        })
    }
}

#[async_trait]
impl TransactionSubmitter for RpcChainClient {
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ChainError> {
        self.rpc
            .send_transaction(tx)
            .await
            .map_err(|e| self.transport(e))
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        recent_blockhash: &Hash,
    ) -> Result<Confirmation, ChainError> {
        let started = Instant::now();

        loop {
            let statuses = self
                .rpc
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| self.transport(e))?;

            if let Some(status) = statuses.value.into_iter().next().flatten() {
                if status.satisfies_commitment(self.commitment) {
                    debug!(%signature, slot = status.slot, "Signature status reached commitment");
                    return Ok(Confirmation {
                        slot: status.slot,
                        err: status.err.map(|e| format!("{:?}", e)),
                    });
                }
                trace!(%signature, slot = status.slot, "Signature seen, waiting for commitment");
            } else {
                let valid = self
                    .rpc
                    .is_blockhash_valid(recent_blockhash, self.commitment)
                    .await
                    .map_err(|e| self.transport(e))?;
                if !valid {
                    return Err(ChainError::BlockhashExpired {
                        blockhash: recent_blockhash.to_string(),
                    });
                }
            }

            if started.elapsed() >= self.confirm_timeout {
                return Err(ChainError::Timeout {
                    timeout_ms: self.confirm_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
