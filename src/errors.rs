//! Error types for the trading pipeline
//!
//! Every public operation returns a single outcome or a single `TradeError`.
//! Nothing in this crate retries; `is_retryable()` is advice for the caller,
//! who must re-invoke with a fresh reserve snapshot.

use crate::chain::ChainError;
use crate::curve::DecodeError;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// Error taxonomy for create / buy / sell operations
#[derive(Error, Debug)]
pub enum TradeError {
    /// A required on-chain account does not exist
    ///
    /// Raised when the global reserve account is missing. Callers should
    /// abort rather than retry: the program is not deployed at the configured id.
    #[error("Account not found: {address}")]
    AccountNotFound {
        /// The address that was read
        address: Pubkey,
    },

    /// Fixed-layout account data could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Caller supplied an out-of-range value (slippage, amounts, metadata)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Simulation reported an error; nothing was submitted
    ///
    /// `detail` is the simulator's error, untouched.
    #[error("Simulation failed: {detail}")]
    SimulationFailed {
        detail: String,
        /// Program logs returned with the simulation, if any
        logs: Vec<String>,
    },

    /// The network rejected the transaction, or it executed with an error
    #[error("Submission failed (signature={signature:?}): {detail}")]
    SubmissionFailed {
        signature: Option<Signature>,
        detail: String,
    },

    /// The transaction was accepted but its outcome could not be confirmed
    #[error("Confirmation failed (signature={signature}): {detail}")]
    ConfirmationFailed { signature: Signature, detail: String },

    /// Chain read failed for a reason other than "account does not exist"
    #[error("RPC error: {0}")]
    Rpc(#[from] ChainError),

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program ID that failed to build an instruction
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Assembled instructions are not in the required order
    ///
    /// Required order:
    /// 1. Associated token account creation (optional)
    /// 2. Launchpad instructions (create, buy, sell)
    /// 3. Priority fee (exactly one, last)
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    /// A required signer was not supplied or signing failed
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl TradeError {
    /// Check if re-invoking the operation (with fresh parameters) might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(e) => e.is_transient(),
            Self::ConfirmationFailed { .. } => true,
            Self::SubmissionFailed { signature, .. } => {
                // Rejected before acceptance (no signature) is usually transient
                signature.is_none()
            }
            Self::SimulationFailed { detail, .. } => {
                // A price move past the slippage bound clears on a fresh quote,
                // an empty wallet does not
                !detail.contains("insufficient") && !detail.contains("InsufficientFunds")
            }

            Self::AccountNotFound { .. } => false,
            Self::Decode(_) => false,
            Self::InvalidParameter(_) => false,
            Self::InstructionBuild { .. } => false,
            Self::InvalidInstructionOrder(_) => false,
            Self::Signing(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::AccountNotFound { .. } => "account_not_found",
            Self::Decode(_) => "decode",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::SimulationFailed { .. } => "simulation",
            Self::SubmissionFailed { .. } => "submission",
            Self::ConfirmationFailed { .. } => "confirmation",
            Self::Rpc(_) => "rpc",
            Self::InstructionBuild { .. } => "instruction",
            Self::InvalidInstructionOrder(_) => "validation",
            Self::Signing(_) => "signing",
        }
    }
}

// Convenience constructors for common error scenarios
impl TradeError {
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }

    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn simulation_failed(detail: impl Into<String>, logs: Vec<String>) -> Self {
        Self::SimulationFailed {
            detail: detail.into(),
            logs,
        }
    }

    /// Create an invalid instruction order error
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }
}
