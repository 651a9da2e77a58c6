// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Content-addressed canonical form consulted before any LM invocation
//! (`spec.md` §4.8). `variations` is carried on the entity for
//! convenience; the repository persists it in a side table keyed back
//! to this benchmark's id.

use serde::{Deserialize, Serialize};

use crate::BenchmarkId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    id: BenchmarkId,
    entity_type: String,
    canonical_name: String,
    data_blob: String,
    is_active: bool,
    variations: Vec<String>,
}

impl Benchmark {
    pub fn new(entity_type: impl Into<String>, canonical_name: impl Into<String>, data_blob: impl Into<String>) -> Self {
        Self {
            id: BenchmarkId::new(),
            entity_type: entity_type.into(),
            canonical_name: canonical_name.into(),
            data_blob: data_blob.into(),
            is_active: true,
            variations: Vec::new(),
        }
    }

    /// Rebuilds a benchmark from already-persisted state, preserving
    /// its original id, active flag, and variation list.
    pub fn reconstitute(
        id: BenchmarkId,
        entity_type: String,
        canonical_name: String,
        data_blob: String,
        is_active: bool,
        variations: Vec<String>,
    ) -> Self {
        Self { id, entity_type, canonical_name, data_blob, is_active, variations }
    }

    pub fn id(&self) -> &BenchmarkId {
        &self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn data_blob(&self) -> &str {
        &self.data_blob
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn variations(&self) -> &[String] {
        &self.variations
    }

    /// Lowercased lookup key used by the benchmark store's content
    /// address (`spec.md` §4.8: keyed by `(entity_type,
    /// lowercased(canonical_name))`).
    pub fn lookup_key(&self) -> (String, String) {
        (self.entity_type.clone(), self.canonical_name.to_lowercase())
    }

    pub fn matches(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.canonical_name.to_lowercase() == lowered
            || self.variations.iter().any(|v| v.to_lowercase() == lowered)
    }

    pub fn add_variation(&mut self, variation: impl Into<String>) {
        let variation = variation.into();
        if !self.variations.iter().any(|v| v.eq_ignore_ascii_case(&variation)) {
            self.variations.push(variation);
        }
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_canonical_and_variations() {
        let mut benchmark = Benchmark::new("catalog_item", "Кабель ВВГ", "{}");
        benchmark.add_variation("кабель ввг-нг");
        assert!(benchmark.matches("КАБЕЛЬ ВВГ"));
        assert!(benchmark.matches("Кабель ВВГ-НГ"));
        assert!(!benchmark.matches("кабель шввп"));
    }

    #[test]
    fn duplicate_variations_are_not_added_twice() {
        let mut benchmark = Benchmark::new("catalog_item", "name", "{}");
        benchmark.add_variation("Alt");
        benchmark.add_variation("alt");
        assert_eq!(benchmark.variations().len(), 1);
    }
}
