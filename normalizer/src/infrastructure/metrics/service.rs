// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service
//!
//! Prometheus-based observability for the normalization pipeline:
//! per-stage completion counters and durations, LM call outcomes, the
//! circuit breaker state, worker-pool saturation, and active session
//! counts (`spec.md` §5).

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tracing::debug;

use normalizer_domain::NormalizationError;

/// Prometheus metrics for normalization pipeline observability.
#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,

    records_processed_total: IntCounter,
    stage_completions_total: IntCounterVec,
    stage_failures_total: IntCounterVec,
    stage_duration_seconds: Histogram,

    lm_calls_total: IntCounterVec,
    lm_circuit_breaker_open: IntGauge,
    lm_worker_pool_in_use: IntGauge,

    active_sessions: IntGauge,
    manual_review_total: IntCounter,
}

impl MetricsService {
    pub fn new() -> Result<Self, NormalizationError> {
        let registry = Registry::new();

        let records_processed_total = IntCounter::with_opts(
            Opts::new("records_processed_total", "Total normalized records written").namespace("normalizer"),
        )
        .map_err(metrics_error("records_processed_total"))?;

        let stage_completions_total = IntCounterVec::new(
            Opts::new("stage_completions_total", "Completed stage transitions, by stage name").namespace("normalizer"),
            &["stage"],
        )
        .map_err(metrics_error("stage_completions_total"))?;

        let stage_failures_total = IntCounterVec::new(
            Opts::new("stage_failures_total", "Recorded stage failures, by stage name").namespace("normalizer"),
            &["stage"],
        )
        .map_err(metrics_error("stage_failures_total"))?;

        let stage_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("stage_duration_seconds", "Time spent executing one pipeline stage")
                .namespace("normalizer")
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )
        .map_err(metrics_error("stage_duration_seconds"))?;

        let lm_calls_total = IntCounterVec::new(
            Opts::new("lm_calls_total", "Completion calls, by outcome (ok/timeout/circuit_open/error)").namespace("normalizer"),
            &["outcome"],
        )
        .map_err(metrics_error("lm_calls_total"))?;

        let lm_circuit_breaker_open =
            IntGauge::with_opts(Opts::new("lm_circuit_breaker_open", "1 if the LM circuit breaker is open").namespace("normalizer"))
                .map_err(metrics_error("lm_circuit_breaker_open"))?;

        let lm_worker_pool_in_use =
            IntGauge::with_opts(Opts::new("lm_worker_pool_in_use", "LM worker pool permits currently held").namespace("normalizer"))
                .map_err(metrics_error("lm_worker_pool_in_use"))?;

        let active_sessions =
            IntGauge::with_opts(Opts::new("active_sessions", "Normalization sessions not yet terminal").namespace("normalizer"))
                .map_err(metrics_error("active_sessions"))?;

        let manual_review_total = IntCounter::with_opts(
            Opts::new("manual_review_total", "Records flagged manual_review_required").namespace("normalizer"),
        )
        .map_err(metrics_error("manual_review_total"))?;

        for metric in [
            Box::new(records_processed_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(stage_completions_total.clone()),
            Box::new(stage_failures_total.clone()),
            Box::new(stage_duration_seconds.clone()),
            Box::new(lm_calls_total.clone()),
            Box::new(lm_circuit_breaker_open.clone()),
            Box::new(lm_worker_pool_in_use.clone()),
            Box::new(active_sessions.clone()),
            Box::new(manual_review_total.clone()),
        ] {
            registry.register(metric).map_err(metrics_error("registry.register"))?;
        }

        debug!("metrics service initialized with prometheus registry");

        Ok(Self {
            registry: Arc::new(registry),
            records_processed_total,
            stage_completions_total,
            stage_failures_total,
            stage_duration_seconds,
            lm_calls_total,
            lm_circuit_breaker_open,
            lm_worker_pool_in_use,
            active_sessions,
            manual_review_total,
        })
    }

    pub fn record_processed(&self) {
        self.records_processed_total.inc();
    }

    pub fn record_stage_completion(&self, stage_name: &str, duration_secs: f64) {
        self.stage_completions_total.with_label_values(&[stage_name]).inc();
        self.stage_duration_seconds.observe(duration_secs);
    }

    pub fn record_stage_failure(&self, stage_name: &str) {
        self.stage_failures_total.with_label_values(&[stage_name]).inc();
    }

    pub fn record_lm_call(&self, outcome: &str) {
        self.lm_calls_total.with_label_values(&[outcome]).inc();
    }

    pub fn set_circuit_breaker_open(&self, open: bool) {
        self.lm_circuit_breaker_open.set(open as i64);
    }

    pub fn set_worker_pool_in_use(&self, in_use: i64) {
        self.lm_worker_pool_in_use.set(in_use);
    }

    pub fn set_active_sessions(&self, count: i64) {
        self.active_sessions.set(count);
    }

    pub fn record_manual_review(&self) {
        self.manual_review_total.inc();
    }

    /// Prometheus text exposition format, for a `/metrics` scrape
    /// endpoint.
    pub fn render(&self) -> Result<String, NormalizationError> {
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).map_err(metrics_error("encode"))
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new().expect("static metric definitions are always valid")
    }
}

fn metrics_error(metric: &'static str) -> impl Fn(prometheus::Error) -> NormalizationError {
    move |e| NormalizationError::internal_error(format!("failed to set up metric `{metric}`: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_namespaced_metric_names() {
        let service = MetricsService::new().unwrap();
        service.record_processed();
        service.record_stage_completion("name_normalization", 0.01);
        let rendered = service.render().unwrap();
        assert!(rendered.contains("normalizer_records_processed_total"));
        assert!(rendered.contains("normalizer_stage_completions_total"));
    }

    #[test]
    fn circuit_breaker_gauge_reflects_state() {
        let service = MetricsService::new().unwrap();
        service.set_circuit_breaker_open(true);
        let rendered = service.render().unwrap();
        assert!(rendered.contains("normalizer_lm_circuit_breaker_open 1"));
    }
}
