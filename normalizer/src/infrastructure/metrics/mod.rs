// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Observability: a `prometheus`-backed metrics registry for the
//! normalization pipeline, the LM client, and session lifecycle.

pub mod service;

pub use service::MetricsService;
