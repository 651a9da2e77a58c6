// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! Layered configuration loading (defaults → config file → environment
//! overrides) built on the `config` crate, mirroring the recognized
//! option groups in `spec.md` §9: pipeline, duplicate detection,
//! LM client, classifier.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub project_id: String,
    pub client_id: String,
    #[serde(default)]
    pub use_kpved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DuplicateWeights {
    pub jw: f64,
    pub lcs: f64,
    pub phonetic: f64,
    pub ngram: f64,
    pub jaccard: f64,
}

impl Default for DuplicateWeights {
    fn default() -> Self {
        Self { jw: 0.3, lcs: 0.2, phonetic: 0.2, ngram: 0.15, jaccard: 0.15 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DuplicateDetectionConfig {
    pub threshold: f64,
    pub batch_size: usize,
    #[serde(default)]
    pub use_advanced: bool,
    #[serde(default)]
    pub weights: DuplicateWeights,
    pub max_items: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakerThresholds {
    pub failure_count: u32,
    pub reset_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LmClientConfig {
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub rate_limit_per_min: u32,
    pub breaker_thresholds: BreakerThresholds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    pub max_workers: usize,
}

fn default_min_confidence() -> f64 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub duplicate_detection: DuplicateDetectionConfig,
    pub lm_client: LmClientConfig,
    pub classifier: ClassifierConfig,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_database_url() -> String {
    "sqlite://normalizer.db".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// `classifier.max_workers` must fall in `[1,2]` per `spec.md` §9; a
/// value outside that range is a configuration error, not clamped
/// silently, so misconfigurations surface at startup.
fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if !(1..=2).contains(&cfg.classifier.max_workers) {
        return Err(ConfigError::Load(config::ConfigError::Message(format!(
            "classifier.max_workers must be 1 or 2, got {}",
            cfg.classifier.max_workers
        ))));
    }
    Ok(())
}

/// Loads configuration from (lowest to highest precedence) a checked-in
/// `config/default.toml`, an optional file at `config_path`, and
/// environment variables prefixed `NORMALIZER__` with `__` as the
/// nested-key separator (e.g. `NORMALIZER__LM_CLIENT__API_KEY`).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = config::Config::builder().add_source(config::File::with_name("config/default").required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let builder = builder.add_source(config::Environment::with_prefix("NORMALIZER").separator("__"));

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_workers_outside_one_or_two_is_rejected() {
        let cfg = AppConfig {
            pipeline: PipelineConfig { project_id: "p".into(), client_id: "c".into(), use_kpved: false },
            duplicate_detection: DuplicateDetectionConfig {
                threshold: 0.85,
                batch_size: 100,
                use_advanced: false,
                weights: DuplicateWeights::default(),
                max_items: 1000,
            },
            lm_client: LmClientConfig {
                model: "gpt".into(),
                api_key: "key".into(),
                timeout_secs: 30,
                rate_limit_per_min: 60,
                breaker_thresholds: BreakerThresholds { failure_count: 5, reset_timeout_secs: 60 },
            },
            classifier: ClassifierConfig { min_confidence: 0.7, max_workers: 7 },
            database_url: default_database_url(),
            bind_address: default_bind_address(),
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn default_min_confidence_matches_spec_floor() {
        assert_eq!(default_min_confidence(), 0.7);
    }
}
