//! Structured logging for pipeline stages

use solana_sdk::signature::Signature;
use uuid::Uuid;

use crate::errors::TradeError;
use crate::tx_builder::TradeKind;

/// Structured logger for one trade operation
///
/// Every event carries the same `context_id`, so the stages of a single
/// create/buy/sell can be correlated in aggregated logs.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
    kind: TradeKind,
}

impl StructuredLogger {
    pub fn new(context_id: String, kind: TradeKind) -> Self {
        Self { context_id, kind }
    }

    /// Fresh logger with a random context id
    pub fn for_operation(kind: TradeKind) -> Self {
        Self::new(Uuid::new_v4().to_string(), kind)
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_built(&self, instruction_count: usize, signer_count: usize) {
        tracing::debug!(
            context_id = %self.context_id,
            kind = %self.kind,
            instruction_count = %instruction_count,
            signer_count = %signer_count,
            "Transaction built"
        );
    }

    pub fn log_simulated(&self, units_consumed: Option<u64>, log_lines: usize) {
        tracing::debug!(
            context_id = %self.context_id,
            kind = %self.kind,
            units_consumed = ?units_consumed,
            log_lines = %log_lines,
            "Simulation succeeded"
        );
    }

    pub fn log_submitted(&self, signature: &Signature) {
        tracing::info!(
            context_id = %self.context_id,
            kind = %self.kind,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn log_confirmed(&self, signature: &Signature, slot: u64, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            kind = %self.kind,
            signature = %signature,
            slot = %slot,
            latency_ms = %latency_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_failure(&self, stage: &str, error: &TradeError) {
        tracing::warn!(
            context_id = %self.context_id,
            kind = %self.kind,
            stage = %stage,
            category = %error.category(),
            retryable = %error.is_retryable(),
            error = %error,
            "Trade stage failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        let a = StructuredLogger::for_operation(TradeKind::Buy);
        let b = StructuredLogger::for_operation(TradeKind::Buy);
        assert_ne!(a.context_id(), b.context_id());
        assert!(Uuid::parse_str(a.context_id()).is_ok());
    }

    #[test]
    fn test_clone_keeps_context() {
        let logger = StructuredLogger::new("ctx-1".to_string(), TradeKind::Sell);
        let cloned = logger.clone();
        assert_eq!(cloned.context_id(), "ctx-1");
        cloned.log_failure("simulate", &TradeError::simulation_failed("boom", vec![]));
    }
}
