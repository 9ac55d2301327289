//! Metrics collection and export module

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Instant;

use crate::errors::TradeError;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub trades_total: IntCounterVec,
    pub trades_success: IntCounter,
    pub trades_failed: IntCounter,
    pub stage_completed: IntCounterVec,
    pub failures: IntCounterVec,
    pub token_accounts_created: IntCounter,

    // Histograms
    pub trade_latency: Histogram,
    pub simulation_latency: Histogram,
    pub confirmation_latency: Histogram,
    pub compute_units: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trades_total = IntCounterVec::new(
            Opts::new("pump_trades_total", "Trades attempted, by operation"),
            &["kind"],
        )?;

        let trades_success = IntCounter::with_opts(Opts::new(
            "pump_trades_success",
            "Trades confirmed without an execution error",
        ))?;

        let trades_failed =
            IntCounter::with_opts(Opts::new("pump_trades_failed", "Trades that failed"))?;

        let stage_completed = IntCounterVec::new(
            Opts::new(
                "pump_pipeline_stage_total",
                "Pipeline stages completed (simulated, submitted, confirmed)",
            ),
            &["stage"],
        )?;

        let failures = IntCounterVec::new(
            Opts::new("pump_failures_total", "Failures by error category"),
            &["category"],
        )?;

        let token_accounts_created = IntCounter::with_opts(Opts::new(
            "pump_token_accounts_created",
            "Associated token accounts created by confirmed trades",
        ))?;

        let trade_latency = Histogram::with_opts(
            HistogramOpts::new("pump_trade_latency_seconds", "End-to-end trade latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let simulation_latency = Histogram::with_opts(
            HistogramOpts::new("pump_simulation_latency_seconds", "Simulation RPC latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "pump_confirmation_latency_seconds",
                "Time from submission to confirmation",
            )
            .buckets(vec![0.4, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let compute_units = Histogram::with_opts(
            HistogramOpts::new("pump_compute_units", "Compute units consumed in simulation")
                .buckets(vec![
                    10_000.0, 25_000.0, 50_000.0, 100_000.0, 200_000.0, 400_000.0,
                ]),
        )?;

        // Register all metrics
        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(trades_success.clone()))?;
        registry.register(Box::new(trades_failed.clone()))?;
        registry.register(Box::new(stage_completed.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(token_accounts_created.clone()))?;
        registry.register(Box::new(trade_latency.clone()))?;
        registry.register(Box::new(simulation_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;
        registry.register(Box::new(compute_units.clone()))?;

        Ok(Self {
            registry,
            trades_total,
            trades_success,
            trades_failed,
            stage_completed,
            failures,
            token_accounts_created,
            trade_latency,
            simulation_latency,
            confirmation_latency,
            compute_units,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_stage(&self, stage: &str) {
        self.stage_completed.with_label_values(&[stage]).inc();
    }

    /// Count a failed trade under its error category
    pub fn record_failure(&self, err: &TradeError) {
        self.trades_failed.inc();
        self.failures.with_label_values(&[err.category()]).inc();
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register() {
        let m = Metrics::new().unwrap();
        m.trades_total.with_label_values(&["buy"]).inc();
        m.record_stage("simulated");

        assert_eq!(m.trades_total.with_label_values(&["buy"]).get(), 1);
        assert_eq!(m.stage_completed.with_label_values(&["simulated"]).get(), 1);
        // Vecs with no children are not gathered
        assert!(m.registry().gather().len() >= 2);
    }

    #[test]
    fn test_record_failure_by_category() {
        let m = Metrics::new().unwrap();
        m.record_failure(&TradeError::simulation_failed("custom program error: 0x1772", vec![]));
        m.record_failure(&TradeError::invalid_parameter("slippage"));
        m.record_failure(&TradeError::simulation_failed("x", vec![]));

        assert_eq!(m.trades_failed.get(), 3);
        assert_eq!(m.failures.with_label_values(&["simulation"]).get(), 2);
        assert_eq!(m.failures.with_label_values(&["invalid_parameter"]).get(), 1);
    }

    #[test]
    fn test_timer_observes() {
        let m = Metrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&m.trade_latency);
        assert_eq!(m.trade_latency.get_sample_count(), 1);
    }
}
