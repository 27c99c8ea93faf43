//! Prometheus metrics for the transaction engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`] that the daemon's
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::ErrorClass;

pub struct EngineMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks handed to a node.
    pub submissions: IntCounter,
    pub confirmations: IntCounter,
    /// Failed attempts, labelled by error class.
    pub failures: IntCounterVec,
    /// Triggers that found an address held by another transaction.
    pub reservation_conflicts: IntCounter,
    pub abandoned: IntCounter,
    /// Records flagged for retry by the staleness sweep.
    pub swept: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// From reservation to the node accepting the block, in milliseconds.
    pub submission_latency_ms: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = register_int_counter_with_registry!(
            Opts::new("tangle_submissions_total", "Blocks submitted to a node"),
            registry
        )?;
        let confirmations = register_int_counter_with_registry!(
            Opts::new("tangle_confirmations_total", "Transactions confirmed"),
            registry
        )?;
        let failures = register_int_counter_vec_with_registry!(
            Opts::new("tangle_failures_total", "Failed attempts by error class"),
            &["class"],
            registry
        )?;
        let reservation_conflicts = register_int_counter_with_registry!(
            Opts::new(
                "tangle_reservation_conflicts_total",
                "Triggers deferred because an address was reserved"
            ),
            registry
        )?;
        let abandoned = register_int_counter_with_registry!(
            Opts::new("tangle_abandoned_total", "Transactions abandoned"),
            registry
        )?;
        let swept = register_int_counter_with_registry!(
            Opts::new("tangle_swept_total", "Transactions flagged for retry by the sweep"),
            registry
        )?;

        // 10 ms → ~160 s.
        let submission_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tangle_submission_latency_ms",
                "Reservation to accepted submission, in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(10.0, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            submissions,
            confirmations,
            failures,
            reservation_conflicts,
            abandoned,
            swept,
            submission_latency_ms,
        })
    }

    pub fn record_failure(&self, class: ErrorClass) {
        self.failures.with_label_values(&[class.as_str()]).inc();
    }

    pub fn failure_count(&self, class: ErrorClass) -> u64 {
        self.failures.with_label_values(&[class.as_str()]).get()
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.submissions.inc();
        metrics.record_failure(ErrorClass::Network);
        metrics.record_failure(ErrorClass::Network);
        assert_eq!(metrics.failure_count(ErrorClass::Network), 2);
        assert_eq!(metrics.failure_count(ErrorClass::Construction), 0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("tangle_submissions_total 1"));
        assert!(text.contains("tangle_failures_total{class=\"network\"} 2"));
    }
}
