// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Normalizer
//!
//! A DDD-layered service that ingests vendor catalog exports, runs
//! them through a staged normalization/classification pipeline, and
//! exposes both ingestion and retrieval over HTTP (`spec.md` §§1-9).
//! `normalizer_domain` owns the model; this crate adapts it to SQLite,
//! an LM completion backend, and axum, and `normalizer_bootstrap`
//! composes the two into a runnable binary.

pub mod application;
pub mod infrastructure;
pub mod presentation;
