// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for the benchmark store (`spec.md` §4.8).

use async_trait::async_trait;

use crate::entities::benchmark::Benchmark;
use crate::{BenchmarkId, NormalizationError};

#[async_trait]
pub trait BenchmarkRepository: Send + Sync {
    async fn save(&self, benchmark: &Benchmark) -> Result<(), NormalizationError>;

    /// `(entity_type, lowercased(canonical_name))` lookup, falling
    /// through to the variations side table when the canonical name
    /// does not match directly.
    async fn find_best_match(
        &self,
        entity_type: &str,
        name: &str,
    ) -> Result<Option<Benchmark>, NormalizationError>;

    async fn find_by_id(&self, id: &BenchmarkId) -> Result<Option<Benchmark>, NormalizationError>;

    async fn list_active(&self, entity_type: &str) -> Result<Vec<Benchmark>, NormalizationError>;
}
