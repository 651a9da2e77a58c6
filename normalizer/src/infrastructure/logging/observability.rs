// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Service
//!
//! Combines the Prometheus [`MetricsService`] with a real-time
//! [`PerformanceTracker`] and threshold-based alerting to produce a
//! single [`SystemHealth`] snapshot for the normalization pipeline.
//!
//! Unlike a byte-throughput pipeline, the unit of work here is a
//! record passing through a pipeline stage (`spec.md` §4.3), so health
//! is scored from the manual-review rate, the per-stage failure rate,
//! and whether the LM circuit breaker is open, rather than from MB/s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::infrastructure::metrics::MetricsService;

/// Real-time performance tracking for the normalization pipeline.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    pub active_records: u32,
    pub total_records: u64,
    pub manual_review_rate_percent: f64,
    pub stage_failure_rate_percent: f64,
    pub system_health_score: f64,
    pub last_update: Instant,
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self {
            active_records: 0,
            total_records: 0,
            manual_review_rate_percent: 0.0,
            stage_failure_rate_percent: 0.0,
            system_health_score: 100.0,
            last_update: Instant::now(),
        }
    }
}

/// Alert thresholds for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub max_manual_review_rate_percent: f64,
    pub max_stage_failure_rate_percent: f64,
    pub max_active_records: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_manual_review_rate_percent: 25.0,
            max_stage_failure_rate_percent: 5.0,
            max_active_records: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: String,
    pub metric_name: String,
    pub current_value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub score: f64,
    pub active_records: u32,
    pub manual_review_rate_percent: f64,
    pub stage_failure_rate_percent: f64,
    pub circuit_breaker_open: bool,
    pub uptime_seconds: u64,
    pub alerts: Vec<Alert>,
}

/// Real-time monitoring, alerting, and health scoring for the
/// normalization pipeline, layered on top of the Prometheus registry.
#[derive(Clone)]
pub struct ObservabilityService {
    metrics_service: Arc<MetricsService>,
    performance_tracker: Arc<RwLock<PerformanceTracker>>,
    alert_thresholds: AlertThresholds,
    circuit_breaker_open: Arc<std::sync::atomic::AtomicBool>,
}

impl ObservabilityService {
    pub fn new(metrics_service: Arc<MetricsService>) -> Self {
        Self {
            metrics_service,
            performance_tracker: Arc::new(RwLock::new(PerformanceTracker::default())),
            alert_thresholds: AlertThresholds::default(),
            circuit_breaker_open: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn with_thresholds(metrics_service: Arc<MetricsService>, alert_thresholds: AlertThresholds) -> Self {
        Self {
            metrics_service,
            performance_tracker: Arc::new(RwLock::new(PerformanceTracker::default())),
            alert_thresholds,
            circuit_breaker_open: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Begin tracking one record's pass through the pipeline.
    pub async fn start_record(&self) -> RecordTracker {
        let mut tracker = self.performance_tracker.write().await;
        tracker.active_records += 1;
        tracker.total_records += 1;
        tracker.last_update = Instant::now();

        debug!(active_records = tracker.active_records, "started tracking record");

        RecordTracker {
            start_time: Instant::now(),
            observability_service: self.clone(),
            completed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Finish tracking one record, recording whether it required
    /// manual review and whether any stage failed along the way.
    pub async fn complete_record(&self, _duration: Duration, manual_review: bool, stage_failed: bool) {
        let mut tracker = self.performance_tracker.write().await;

        if tracker.active_records > 0 {
            tracker.active_records -= 1;
        }

        let total = tracker.total_records as f64;
        if total > 0.0 {
            let review_contribution = if manual_review { 100.0 } else { 0.0 };
            tracker.manual_review_rate_percent = (tracker.manual_review_rate_percent * (total - 1.0) + review_contribution) / total;

            let failure_contribution = if stage_failed { 100.0 } else { 0.0 };
            tracker.stage_failure_rate_percent = (tracker.stage_failure_rate_percent * (total - 1.0) + failure_contribution) / total;
        }

        tracker.last_update = Instant::now();

        if manual_review {
            self.metrics_service.record_manual_review();
        }

        info!(
            manual_review,
            stage_failed, active_records = tracker.active_records, "completed tracking record"
        );

        self.check_alerts(&tracker).await;
    }

    pub fn set_circuit_breaker_open(&self, open: bool) {
        self.circuit_breaker_open.store(open, std::sync::atomic::Ordering::Relaxed);
        self.metrics_service.set_circuit_breaker_open(open);
    }

    /// A weighted health score combining manual-review rate, stage
    /// failure rate, circuit breaker state, and queue depth.
    pub async fn get_system_health(&self) -> SystemHealth {
        let tracker = self.performance_tracker.read().await;
        let uptime = tracker.last_update.elapsed().as_secs();
        let circuit_open = self.circuit_breaker_open.load(std::sync::atomic::Ordering::Relaxed);

        let mut score = 100.0;
        let mut alerts = Vec::new();

        if tracker.manual_review_rate_percent > self.alert_thresholds.max_manual_review_rate_percent {
            score -= 25.0;
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                message: format!("high manual review rate: {:.1}%", tracker.manual_review_rate_percent),
                timestamp: chrono::Utc::now().to_rfc3339(),
                metric_name: "manual_review_rate_percent".to_string(),
                current_value: tracker.manual_review_rate_percent,
                threshold: self.alert_thresholds.max_manual_review_rate_percent,
            });
        }

        if tracker.stage_failure_rate_percent > self.alert_thresholds.max_stage_failure_rate_percent {
            score -= 30.0;
            alerts.push(Alert {
                severity: AlertSeverity::Critical,
                message: format!("high stage failure rate: {:.1}%", tracker.stage_failure_rate_percent),
                timestamp: chrono::Utc::now().to_rfc3339(),
                metric_name: "stage_failure_rate_percent".to_string(),
                current_value: tracker.stage_failure_rate_percent,
                threshold: self.alert_thresholds.max_stage_failure_rate_percent,
            });
        }

        if circuit_open {
            score -= 20.0;
            alerts.push(Alert {
                severity: AlertSeverity::Critical,
                message: "LM circuit breaker open".to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                metric_name: "lm_circuit_breaker_open".to_string(),
                current_value: 1.0,
                threshold: 0.0,
            });
        }

        if tracker.active_records > self.alert_thresholds.max_active_records {
            score -= 15.0;
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                message: format!("{} records in flight", tracker.active_records),
                timestamp: chrono::Utc::now().to_rfc3339(),
                metric_name: "active_records".to_string(),
                current_value: tracker.active_records as f64,
                threshold: self.alert_thresholds.max_active_records as f64,
            });
        }

        let status = if score >= 90.0 {
            HealthStatus::Healthy
        } else if score >= 60.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        };

        SystemHealth {
            status,
            score: score.max(0.0),
            active_records: tracker.active_records,
            manual_review_rate_percent: tracker.manual_review_rate_percent,
            stage_failure_rate_percent: tracker.stage_failure_rate_percent,
            circuit_breaker_open: circuit_open,
            uptime_seconds: uptime,
            alerts,
        }
    }

    async fn check_alerts(&self, tracker: &PerformanceTracker) {
        if tracker.stage_failure_rate_percent > self.alert_thresholds.max_stage_failure_rate_percent {
            warn!(
                rate = tracker.stage_failure_rate_percent,
                threshold = self.alert_thresholds.max_stage_failure_rate_percent,
                "stage failure rate above threshold"
            );
        }
        if tracker.active_records > self.alert_thresholds.max_active_records {
            warn!(active_records = tracker.active_records, "high number of records in flight");
        }
    }

    pub async fn get_performance_summary(&self) -> String {
        let tracker = self.performance_tracker.read().await;
        let health = self.get_system_health().await;

        format!(
            "active records: {}\ntotal records: {}\nmanual review rate: {:.1}%\nstage failure rate: {:.1}%\nhealth: {:.1}/100 \
             ({:?})\nalerts: {}",
            tracker.active_records,
            tracker.total_records,
            tracker.manual_review_rate_percent,
            tracker.stage_failure_rate_percent,
            health.score,
            health.status,
            health.alerts.len()
        )
    }
}

/// Tracks one record's traversal of the pipeline; reports a failed
/// completion if dropped without an explicit [`RecordTracker::complete`].
pub struct RecordTracker {
    start_time: Instant,
    observability_service: ObservabilityService,
    completed: std::sync::atomic::AtomicBool,
}

impl RecordTracker {
    pub async fn complete(self, manual_review: bool, stage_failed: bool) {
        self.completed.store(true, std::sync::atomic::Ordering::Relaxed);
        let duration = self.start_time.elapsed();
        self.observability_service.complete_record(duration, manual_review, stage_failed).await;
    }
}

impl Drop for RecordTracker {
    fn drop(&mut self) {
        if !self.completed.load(std::sync::atomic::Ordering::Relaxed) {
            let observability_service = self.observability_service.clone();
            let duration = self.start_time.elapsed();
            tokio::spawn(async move {
                observability_service.complete_record(duration, false, true).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_starts_healthy() {
        let metrics = Arc::new(MetricsService::new().unwrap());
        let service = ObservabilityService::new(metrics);
        let health = service.get_system_health().await;
        assert!(matches!(health.status, HealthStatus::Healthy));
        assert_eq!(health.score, 100.0);
    }

    #[tokio::test]
    async fn repeated_manual_review_degrades_health() {
        let metrics = Arc::new(MetricsService::new().unwrap());
        let service = ObservabilityService::new(metrics);
        for _ in 0..10 {
            let tracker = service.start_record().await;
            tracker.complete(true, false).await;
        }
        let health = service.get_system_health().await;
        assert!(health.score < 100.0);
        assert!(!health.alerts.is_empty());
    }

    #[tokio::test]
    async fn circuit_breaker_open_is_reflected_in_health() {
        let metrics = Arc::new(MetricsService::new().unwrap());
        let service = ObservabilityService::new(metrics);
        service.set_circuit_breaker_open(true);
        let health = service.get_system_health().await;
        assert!(health.circuit_breaker_open);
        assert!(matches!(health.status, HealthStatus::Warning | HealthStatus::Critical));
    }
}
