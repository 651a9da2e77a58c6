// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Configuration Service
//!
//! `normalizer_bootstrap::config::AppConfig` owns the domain-facing
//! settings (pipeline, duplicate detection, LM client, classifier).
//! This service owns the observability-facing settings that sit beside
//! them: log format, the alert thresholds fed into
//! [`crate::infrastructure::logging::AlertThresholds`], and the
//! `/metrics` port — loaded from an optional checked-in
//! `observability.toml`, falling back to defaults when absent.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use normalizer_domain::NormalizationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
    pub alerts: AlertSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    pub max_manual_review_rate_percent: f64,
    pub max_stage_failure_rate_percent: f64,
    pub max_active_records: u32,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging: LoggingSettings { level: "info".to_string(), format: "pretty".to_string() },
            metrics: MetricsSettings { port: 9090 },
            alerts: AlertSettings {
                max_manual_review_rate_percent: 25.0,
                max_stage_failure_rate_percent: 5.0,
                max_active_records: 500,
            },
        }
    }
}

pub struct ConfigService;

impl ConfigService {
    pub async fn load_observability_config<P: AsRef<Path>>(config_path: P) -> Result<ObservabilityConfig, NormalizationError> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            warn!(path = ?config_path, "observability config file not found, using defaults");
            return Ok(ObservabilityConfig::default());
        }

        let contents = fs::read_to_string(config_path)
            .await
            .map_err(|e| NormalizationError::invalid_config(format!("failed to read {config_path:?}: {e}")))?;

        let config: ObservabilityConfig =
            toml::from_str(&contents).map_err(|e| NormalizationError::invalid_config(format!("failed to parse {config_path:?}: {e}")))?;

        debug!(path = ?config_path, metrics_port = config.metrics.port, "loaded observability config");

        Ok(config)
    }

    /// Looks for `observability.toml` in the current directory and up
    /// to three parent directories, falling back to defaults.
    pub async fn load_default_observability_config() -> Result<ObservabilityConfig, NormalizationError> {
        let mut current_dir =
            std::env::current_dir().map_err(|e| NormalizationError::invalid_config(format!("failed to get current directory: {e}")))?;

        for _ in 0..4 {
            let candidate = current_dir.join("observability.toml");
            if candidate.exists() {
                return Self::load_observability_config(candidate).await;
            }
            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        warn!("no observability.toml found, using default configuration");
        Ok(ObservabilityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_alerting_floor() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics.port, 9090);
        assert_eq!(config.alerts.max_stage_failure_rate_percent, 5.0);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let config = ConfigService::load_observability_config("/nonexistent/observability.toml").await.unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
