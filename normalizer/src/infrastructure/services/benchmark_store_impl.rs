// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Benchmark store lookup (`spec.md` §4.8), consulted before any LM
//! invocation. Wraps [`BenchmarkRepository`] with a `dashmap` read
//! cache keyed by the same `(entity_type, lowercased name)` address the
//! repository uses, since the store is read far more often than it is
//! written (new canonical entries arrive only via `LoadBenchmarks`).

use dashmap::DashMap;
use std::sync::Arc;

use normalizer_domain::repositories::BenchmarkRepository;
use normalizer_domain::services::hierarchical_classifier::{ClassificationStep, KeywordClassifier};
use normalizer_domain::services::name_normalizer::NameNormalizer;
use normalizer_domain::{Benchmark, CodeLevel, Confidence, NormalizationError};

pub struct CachedBenchmarkStore {
    repository: Arc<dyn BenchmarkRepository>,
    cache: DashMap<(String, String), Option<Benchmark>>,
}

impl CachedBenchmarkStore {
    pub fn new(repository: Arc<dyn BenchmarkRepository>) -> Self {
        Self { repository, cache: DashMap::new() }
    }

    pub async fn find_best_match(&self, entity_type: &str, name: &str) -> Result<Option<Benchmark>, NormalizationError> {
        let key = (entity_type.to_string(), name.to_lowercase());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let found = self.repository.find_best_match(entity_type, name).await?;
        self.cache.insert(key, found.clone());
        Ok(found)
    }

    pub async fn save(&self, benchmark: &Benchmark) -> Result<(), NormalizationError> {
        self.repository.save(benchmark).await?;
        self.cache.remove(&benchmark.lookup_key());
        Ok(())
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Seeds the keyword classifier's dictionary from every active
    /// benchmark, so the fast path has entries from the first request
    /// instead of waiting on online learning (`spec.md` §4.8 "a seed
    /// for the keyword classifier"). Each benchmark's root word maps to
    /// a synthetic group-level step built from its stored code/name, at
    /// full confidence since an admin-curated benchmark is treated as
    /// ground truth.
    pub async fn seed_keyword_classifier(
        &self,
        entity_type: &str,
        name_normalizer: &dyn NameNormalizer,
        keyword_classifier: &dyn KeywordClassifier,
    ) -> Result<u32, NormalizationError> {
        let active = self.repository.list_active(entity_type).await?;
        let mut seeded = 0u32;
        for benchmark in &active {
            let root_word = name_normalizer.root_word(benchmark.canonical_name());
            let step = ClassificationStep {
                level: CodeLevel::Group,
                code: benchmark.data_blob().to_string(),
                name: benchmark.canonical_name().to_string(),
                confidence: Confidence::ONE,
                reasoning: "seeded from benchmark store".to_string(),
            };
            keyword_classifier.learn(&root_word, step);
            seeded += 1;
        }
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use normalizer_domain::BenchmarkId;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingRepository {
        calls: AtomicU32,
        benchmark: Benchmark,
    }

    #[async_trait]
    impl BenchmarkRepository for CountingRepository {
        async fn save(&self, _benchmark: &Benchmark) -> Result<(), NormalizationError> {
            Ok(())
        }

        async fn find_best_match(&self, _entity_type: &str, _name: &str) -> Result<Option<Benchmark>, NormalizationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.benchmark.clone()))
        }

        async fn find_by_id(&self, _id: &BenchmarkId) -> Result<Option<Benchmark>, NormalizationError> {
            Ok(Some(self.benchmark.clone()))
        }

        async fn list_active(&self, _entity_type: &str) -> Result<Vec<Benchmark>, NormalizationError> {
            Ok(vec![self.benchmark.clone()])
        }
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let repository =
            Arc::new(CountingRepository { calls: AtomicU32::new(0), benchmark: Benchmark::new("catalog_item", "Кабель ВВГ", "{}") });
        let store = CachedBenchmarkStore::new(repository.clone());

        store.find_best_match("catalog_item", "Кабель ВВГ").await.unwrap();
        store.find_best_match("catalog_item", "кабель ввг").await.unwrap();

        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
    }
}
