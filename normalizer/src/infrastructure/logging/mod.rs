// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structured logging and observability for the infrastructure layer.
//!
//! Post-init log emission in this crate goes through `tracing`; the
//! pre-init bootstrap logging split (before configuration is loaded)
//! lives in `normalizer_bootstrap::logger`. This module layers
//! real-time health scoring and alerting on top of `tracing` and the
//! Prometheus [`crate::infrastructure::metrics::MetricsService`].

pub mod observability;

pub use observability::{AlertThresholds, ObservabilityService, SystemHealth};
