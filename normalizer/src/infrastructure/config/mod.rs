// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Observability-facing configuration (log format, alert thresholds,
//! the metrics port). Domain-facing settings — pipeline, duplicate
//! detection, LM client, classifier — are owned by
//! `normalizer_bootstrap::config::AppConfig`, loaded once at startup
//! and threaded into the composition root; this module is the thinner,
//! optionally-reloadable layer beside it.

pub mod config_service;

pub use config_service::{AlertSettings, ConfigService, LoggingSettings, MetricsSettings, ObservabilityConfig};
