//! Simulate → submit → confirm
//!
//! Each stage consumes the previous stage's value, so a transaction cannot
//! be submitted without having passed simulation, and cannot be confirmed
//! without having been accepted. No stage retries.

use solana_sdk::{
    hash::Hash,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::addresses::AddressDeriver;
use crate::chain::{ChainReader, SimulationOutcome, TransactionSimulator, TransactionSubmitter};
use crate::errors::TradeError;
use crate::metrics::{metrics, Timer};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::output::{BuiltTransaction, TradeKind};
use crate::tx_builder::simulate::{
    compile_for_simulation, select_signers, sign_for_submission, SimulatedTransaction,
};

/// Accepted by the network, outcome pending
#[derive(Debug, Clone)]
pub struct SubmittedTransaction {
    kind: TradeKind,
    signature: Signature,
    recent_blockhash: Hash,
    units_consumed: Option<u64>,
    submitted_at: Instant,
    logger: StructuredLogger,
}

impl SubmittedTransaction {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn kind(&self) -> TradeKind {
        self.kind
    }
}

/// Final result of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTrade {
    pub signature: Signature,
    pub slot: u64,
    pub kind: TradeKind,
    /// Compute units reported by simulation
    pub units_consumed: Option<u64>,
    /// The transaction created the payer's token account
    pub created_token_account: bool,
}

/// Runs built transactions through the chain collaborators
#[derive(Clone)]
pub struct TxPipeline {
    reader: Arc<dyn ChainReader>,
    simulator: Arc<dyn TransactionSimulator>,
    submitter: Arc<dyn TransactionSubmitter>,
    deriver: AddressDeriver,
}

impl TxPipeline {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        simulator: Arc<dyn TransactionSimulator>,
        submitter: Arc<dyn TransactionSubmitter>,
        deriver: AddressDeriver,
    ) -> Self {
        Self {
            reader,
            simulator,
            submitter,
            deriver,
        }
    }

    /// Validate, compile against a fresh blockhash, sign with the payer
    /// and simulate
    ///
    /// Any simulation failure, including a transport error while
    /// simulating, ends the operation here.
    pub async fn simulate(
        &self,
        built: BuiltTransaction,
        payer: &Keypair,
    ) -> Result<SimulatedTransaction, TradeError> {
        let logger = StructuredLogger::for_operation(built.kind());
        let result = self.simulate_inner(&built, payer, &logger).await;
        if let Err(e) = &result {
            logger.log_failure("simulate", e);
        }
        result.map(|(transaction, outcome)| SimulatedTransaction {
            kind: built.kind(),
            transaction,
            required_signers: built.required_signers().to_vec(),
            logs: outcome.logs,
            units_consumed: outcome.units_consumed,
            logger,
        })
    }

    async fn simulate_inner(
        &self,
        built: &BuiltTransaction,
        payer: &Keypair,
        logger: &StructuredLogger,
    ) -> Result<(Transaction, SimulationOutcome), TradeError> {
        built.validate(&self.deriver)?;
        logger.log_built(built.instructions().len(), built.required_signers().len());

        let blockhash = self.reader.latest_blockhash().await?;
        let tx = compile_for_simulation(built, payer, blockhash)?;

        let timer = Timer::new();
        let outcome = self
            .simulator
            .simulate(&tx)
            .await
            .map_err(|e| TradeError::simulation_failed(e.to_string(), Vec::new()))?;
        timer.observe_duration(&metrics().simulation_latency);

        if let Some(detail) = outcome.err {
            for line in &outcome.logs {
                debug!(context_id = %logger.context_id(), "{}", line);
            }
            return Err(TradeError::simulation_failed(detail, outcome.logs));
        }

        if let Some(units) = outcome.units_consumed {
            metrics().compute_units.observe(units as f64);
        }
        metrics().record_stage("simulated");
        logger.log_simulated(outcome.units_consumed, outcome.logs.len());
        Ok((tx, outcome))
    }

    /// Sign with every required signer and send
    pub async fn submit(
        &self,
        simulated: SimulatedTransaction,
        signers: &[&Keypair],
    ) -> Result<SubmittedTransaction, TradeError> {
        let logger = simulated.logger.clone();

        let tx = match sign_for_submission(&simulated, signers) {
            Ok(tx) => tx,
            Err(e) => {
                logger.log_failure("sign", &e);
                return Err(e);
            }
        };

        let signature = match self.submitter.send_transaction(&tx).await {
            Ok(signature) => signature,
            Err(e) => {
                let err = TradeError::SubmissionFailed {
                    signature: None,
                    detail: e.to_string(),
                };
                logger.log_failure("submit", &err);
                return Err(err);
            }
        };

        metrics().record_stage("submitted");
        logger.log_submitted(&signature);

        Ok(SubmittedTransaction {
            kind: simulated.kind,
            signature,
            recent_blockhash: tx.message.recent_blockhash,
            units_consumed: simulated.units_consumed,
            submitted_at: Instant::now(),
            logger,
        })
    }

    /// Wait for the network's verdict
    ///
    /// An execution error in the confirmed status is a submission failure
    /// (the transaction landed and failed); failing to obtain a verdict is
    /// a confirmation failure.
    pub async fn confirm(&self, submitted: SubmittedTransaction) -> Result<ConfirmedTrade, TradeError> {
        let SubmittedTransaction {
            kind,
            signature,
            recent_blockhash,
            units_consumed,
            submitted_at,
            logger,
        } = submitted;

        let confirmation = match self
            .submitter
            .confirm_transaction(&signature, &recent_blockhash)
            .await
        {
            Ok(confirmation) => confirmation,
            Err(e) => {
                let err = TradeError::ConfirmationFailed {
                    signature,
                    detail: e.to_string(),
                };
                logger.log_failure("confirm", &err);
                return Err(err);
            }
        };

        if let Some(detail) = confirmation.err {
            let err = TradeError::SubmissionFailed {
                signature: Some(signature),
                detail,
            };
            logger.log_failure("confirm", &err);
            return Err(err);
        }

        let latency = submitted_at.elapsed();
        metrics()
            .confirmation_latency
            .observe(latency.as_secs_f64());
        metrics().record_stage("confirmed");
        logger.log_confirmed(&signature, confirmation.slot, latency.as_millis() as u64);

        Ok(ConfirmedTrade {
            signature,
            slot: confirmation.slot,
            kind,
            units_consumed,
            created_token_account: false,
        })
    }

    /// Run all stages; the first signer whose key matches the fee payer
    /// signs the simulation
    pub async fn execute(
        &self,
        built: BuiltTransaction,
        signers: &[&Keypair],
    ) -> Result<ConfirmedTrade, TradeError> {
        let kind = built.kind();
        let timer = Timer::new();
        metrics().trades_total.with_label_values(&[kind.as_str()]).inc();

        let result = self.execute_stages(built, signers).await;

        match &result {
            Ok(trade) => {
                metrics().trades_success.inc();
                timer.observe_duration(&metrics().trade_latency);
                debug!(%kind, signature = %trade.signature, elapsed_ms = timer.elapsed_ms(), "Trade complete");
            }
            Err(e) => {
                metrics().record_failure(e);
                warn!(%kind, category = e.category(), elapsed_ms = timer.elapsed_ms(), "Trade failed");
            }
        }
        result
    }

    async fn execute_stages(
        &self,
        built: BuiltTransaction,
        signers: &[&Keypair],
    ) -> Result<ConfirmedTrade, TradeError> {
        let payer = select_signers(&[*built.payer()], signers)?
            .into_iter()
            .next()
            .ok_or_else(|| TradeError::Signing("no payer keypair supplied".to_string()))?;

        let simulated = self.simulate(built, payer).await?;
        let submitted = self.submit(simulated, signers).await?;
        self.confirm(submitted).await
    }
}
