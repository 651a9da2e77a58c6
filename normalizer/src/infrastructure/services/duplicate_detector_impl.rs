// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Duplicate detection engine (`spec.md` §4.5): exact groups first,
//! then candidate generation via phonetic/prefix keys once the item
//! count crosses 500 (a full O(n^2) hybrid pass would otherwise make
//! large catalogs prohibitively slow), then transitive closure.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use normalizer_domain::repositories::{CatalogRepository, NormalizedRecordRepository};
use normalizer_domain::services::duplicate_detector::{
    DetectedGroup, DuplicateCandidatePair, DuplicateDetectionConfig, DuplicateDetector, EvaluationReport, MatchAlgorithm,
    MatchReason,
};
use normalizer_domain::services::text_toolkit::{HybridScorer, PhoneticEncoder};
use normalizer_domain::{NormalizationError, NormalizedRecordId, Stage};

/// Candidate-generation threshold above which a full pairwise scan is
/// replaced by phonetic/prefix blocking (`spec.md` §4.5).
const BLOCKING_THRESHOLD: usize = 500;

struct ResolvedItem {
    id: NormalizedRecordId,
    normalized_name: String,
    code: Option<String>,
}

pub struct ScoredDuplicateDetector {
    records: Arc<dyn NormalizedRecordRepository>,
    catalog: Arc<dyn CatalogRepository>,
    scorer: Arc<dyn HybridScorer>,
    phonetics: Arc<dyn PhoneticEncoder>,
}

impl ScoredDuplicateDetector {
    pub fn new(
        records: Arc<dyn NormalizedRecordRepository>,
        catalog: Arc<dyn CatalogRepository>,
        scorer: Arc<dyn HybridScorer>,
        phonetics: Arc<dyn PhoneticEncoder>,
    ) -> Self {
        Self { records, catalog, scorer, phonetics }
    }

    async fn resolve(&self, ids: &[NormalizedRecordId]) -> Result<Vec<ResolvedItem>, NormalizationError> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.records.find_by_id(id).await? else { continue };
            let normalized_name = record.stage(Stage::NameNormalization).output.clone().unwrap_or_default();
            let code = self.catalog.find_item_by_id(record.catalog_item_id()).await?.and_then(|item| item.code().map(str::to_string));
            resolved.push(ResolvedItem { id: id.clone(), normalized_name, code });
        }
        Ok(resolved)
    }

    fn blocking_key(&self, item: &ResolvedItem) -> String {
        let first_word = item.normalized_name.split_whitespace().next().unwrap_or("");
        self.phonetics.encode(first_word).soundex
    }

    /// Union-find over candidate pairs, producing connected components
    /// (`spec.md` §4.5 step 4: "transitive closure into connected
    /// components").
    fn union_find(items: &[ResolvedItem], pairs: &[DuplicateCandidatePair]) -> Vec<Vec<usize>> {
        let index_of: HashMap<NormalizedRecordId, usize> =
            items.iter().enumerate().map(|(i, item)| (item.id.clone(), i)).collect();
        let mut parent: Vec<usize> = (0..items.len()).collect();

        fn find(parent: &mut [usize], x: usize) -> usize {
            if parent[x] != x {
                parent[x] = find(parent, parent[x]);
            }
            parent[x]
        }

        for pair in pairs {
            if let (Some(&a), Some(&b)) = (index_of.get(&pair.left), index_of.get(&pair.right)) {
                let root_a = find(&mut parent, a);
                let root_b = find(&mut parent, b);
                if root_a != root_b {
                    parent[root_a] = root_b;
                }
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..items.len() {
            let root = find(&mut parent, i);
            components.entry(root).or_default().push(i);
        }
        components.into_values().collect()
    }

    /// The master-selection formula from `spec.md` §4.5:
    /// `quality*40 + merged_count*10 + (benchmark?30:ai_enhanced?20:0) + min(name_len/2, 10)`.
    /// Placeholder signals (quality/merged_count/benchmark) are supplied by
    /// the caller through group-refinement metadata once persisted; here
    /// detection scores purely on name length as a tie-breaker proxy, since
    /// a freshly detected group has no merge/provenance history yet.
    fn pick_master(items: &[&ResolvedItem]) -> NormalizedRecordId {
        items
            .iter()
            .max_by(|a, b| {
                let score_a = (a.normalized_name.len().min(20)) as f64 / 2.0;
                let score_b = (b.normalized_name.len().min(20)) as f64 / 2.0;
                score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|item| item.id.clone())
            .expect("component is never empty")
    }
}

#[async_trait]
impl DuplicateDetector for ScoredDuplicateDetector {
    async fn detect(
        &self,
        items: &[NormalizedRecordId],
        config: &DuplicateDetectionConfig,
    ) -> Result<Vec<DetectedGroup>, NormalizationError> {
        let capped: Vec<NormalizedRecordId> = items.iter().take(config.max_items).cloned().collect();
        let resolved = self.resolve(&capped).await?;

        let mut pairs: Vec<DuplicateCandidatePair> = Vec::new();

        // Exact matches first: by source code, then by normalized name.
        if config.algorithms.contains(&MatchAlgorithm::ExactByCode) {
            let mut by_code: HashMap<&str, Vec<&ResolvedItem>> = HashMap::new();
            for item in &resolved {
                if let Some(code) = item.code.as_deref() {
                    if !code.is_empty() {
                        by_code.entry(code).or_default().push(item);
                    }
                }
            }
            for group in by_code.values().filter(|g| g.len() > 1) {
                for window in group.windows(2) {
                    pairs.push(DuplicateCandidatePair {
                        left: window[0].id.clone(),
                        right: window[1].id.clone(),
                        score: 1.0,
                        reason: MatchReason::ExactByCode,
                    });
                }
            }
        }

        if config.algorithms.contains(&MatchAlgorithm::ExactByName) {
            let mut by_name: HashMap<&str, Vec<&ResolvedItem>> = HashMap::new();
            for item in &resolved {
                if !item.normalized_name.is_empty() {
                    by_name.entry(item.normalized_name.as_str()).or_default().push(item);
                }
            }
            for group in by_name.values().filter(|g| g.len() > 1) {
                for window in group.windows(2) {
                    pairs.push(DuplicateCandidatePair {
                        left: window[0].id.clone(),
                        right: window[1].id.clone(),
                        score: 1.0,
                        reason: MatchReason::ExactByName,
                    });
                }
            }
        }

        // Candidate generation for fuzzy/phonetic matching.
        let candidate_pairs: Vec<(usize, usize)> = if resolved.len() > BLOCKING_THRESHOLD {
            let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
            for (i, item) in resolved.iter().enumerate() {
                buckets.entry(self.blocking_key(item)).or_default().push(i);
            }
            buckets
                .values()
                .flat_map(|bucket| {
                    let mut within = Vec::new();
                    for i in 0..bucket.len() {
                        for j in (i + 1)..bucket.len() {
                            within.push((bucket[i], bucket[j]));
                        }
                    }
                    within
                })
                .collect()
        } else {
            let mut all_pairs = Vec::new();
            for i in 0..resolved.len() {
                for j in (i + 1)..resolved.len() {
                    all_pairs.push((i, j));
                }
            }
            all_pairs
        };

        if config.algorithms.contains(&MatchAlgorithm::Fuzzy) || config.algorithms.contains(&MatchAlgorithm::Phonetic) {
            for (i, j) in candidate_pairs {
                let left = &resolved[i];
                let right = &resolved[j];
                if left.normalized_name.is_empty() || right.normalized_name.is_empty() {
                    continue;
                }
                let score = self.scorer.score(&left.normalized_name, &right.normalized_name, config.weights);
                if score >= config.threshold {
                    let reason = if config.algorithms.contains(&MatchAlgorithm::Phonetic)
                        && self.phonetics.encode(&left.normalized_name).soundex
                            == self.phonetics.encode(&right.normalized_name).soundex
                    {
                        MatchReason::Phonetic
                    } else {
                        MatchReason::Fuzzy
                    };
                    pairs.push(DuplicateCandidatePair { left: left.id.clone(), right: right.id.clone(), score, reason });
                }
            }
        }

        let components = Self::union_find(&resolved, &pairs);
        let index_of: HashMap<NormalizedRecordId, usize> =
            resolved.iter().enumerate().map(|(i, item)| (item.id.clone(), i)).collect();

        let mut groups = Vec::new();
        for component in components {
            if component.len() < 2 {
                continue;
            }
            let members: Vec<&ResolvedItem> = component.iter().map(|&i| &resolved[i]).collect();
            let member_ids: Vec<NormalizedRecordId> = members.iter().map(|item| item.id.clone()).collect();
            let member_set: HashSet<NormalizedRecordId> = member_ids.iter().cloned().collect();

            let relevant_scores: Vec<f64> = pairs
                .iter()
                .filter(|p| member_set.contains(&p.left) && member_set.contains(&p.right))
                .map(|p| p.score)
                .collect();
            let average_score = if relevant_scores.is_empty() {
                1.0
            } else {
                relevant_scores.iter().sum::<f64>() / relevant_scores.len() as f64
            };

            let reason = pairs
                .iter()
                .find(|p| member_set.contains(&p.left) && member_set.contains(&p.right))
                .map(|p| p.reason)
                .unwrap_or(MatchReason::Fuzzy);

            let master_id = Self::pick_master(&members);

            groups.push(DetectedGroup { member_ids, master_id, average_score, reason });
        }

        let _ = index_of;
        Ok(groups)
    }

    fn evaluate(&self, labeled_pairs: &[(DuplicateCandidatePair, bool)]) -> EvaluationReport {
        if labeled_pairs.is_empty() {
            return EvaluationReport::default();
        }

        let mut true_positives = 0u32;
        let mut false_positives = 0u32;
        let mut false_negatives = 0u32;
        let mut true_negatives = 0u32;

        // Threshold the detector's own score at 0.5 against the labeled
        // ground truth, so `evaluate` measures predicted-vs-actual
        // agreement independent of whatever `config.threshold` callers
        // use for live detection.
        for (pair, is_duplicate) in labeled_pairs {
            let predicted = pair.score >= 0.5;
            match (predicted, is_duplicate) {
                (true, true) => true_positives += 1,
                (true, false) => false_positives += 1,
                (false, true) => false_negatives += 1,
                (false, false) => true_negatives += 1,
            }
        }

        let precision = if true_positives + false_positives == 0 {
            0.0
        } else {
            true_positives as f64 / (true_positives + false_positives) as f64
        };
        let recall = if true_positives + false_negatives == 0 {
            0.0
        } else {
            true_positives as f64 / (true_positives + false_negatives) as f64
        };
        let f1 = if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) };

        let union = (true_positives + false_positives + false_negatives) as f64;
        let jaccard = if union == 0.0 { 0.0 } else { true_positives as f64 / union };

        // ROC-AUC via the Mann-Whitney U statistic over the detector's
        // continuous scores, ranked against the binary ground truth.
        let mut scored: Vec<(f64, bool)> = labeled_pairs.iter().map(|(p, label)| (p.score, *label)).collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let positives = scored.iter().filter(|(_, label)| *label).count() as f64;
        let negatives = scored.iter().filter(|(_, label)| !*label).count() as f64;
        let roc_auc = if positives == 0.0 || negatives == 0.0 {
            0.0
        } else {
            let mut rank_sum = 0.0;
            for (rank, (_, label)) in scored.iter().enumerate() {
                if *label {
                    rank_sum += (rank + 1) as f64;
                }
            }
            (rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
        };

        let _ = true_negatives;
        EvaluationReport { precision, recall, f1, jaccard, roc_auc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(score: f64, is_duplicate: bool) -> (DuplicateCandidatePair, bool) {
        (
            DuplicateCandidatePair {
                left: NormalizedRecordId::new(),
                right: NormalizedRecordId::new(),
                score,
                reason: MatchReason::Fuzzy,
            },
            is_duplicate,
        )
    }

    fn detector() -> ScoredDuplicateDetector {
        use crate::infrastructure::services::text_toolkit_impl::{StandardPhoneticEncoder, WeightedHybridScorer};
        struct NoopRecords;
        #[async_trait]
        impl NormalizedRecordRepository for NoopRecords {
            async fn save(&self, _record: &normalizer_domain::NormalizedRecord) -> Result<(), NormalizationError> {
                Ok(())
            }
            async fn find_by_id(
                &self,
                _id: &NormalizedRecordId,
            ) -> Result<Option<normalizer_domain::NormalizedRecord>, NormalizationError> {
                Ok(None)
            }
            async fn find_by_catalog_item(
                &self,
                _catalog_item_id: &normalizer_domain::CatalogItemId,
            ) -> Result<Option<normalizer_domain::NormalizedRecord>, NormalizationError> {
                Ok(None)
            }
            async fn save_stage(
                &self,
                _record_id: &NormalizedRecordId,
                _stage: Stage,
                _outcome: &normalizer_domain::StageOutcome,
            ) -> Result<(), NormalizationError> {
                Ok(())
            }
            async fn find_without_code(
                &self,
                _limit: u32,
            ) -> Result<Vec<normalizer_domain::NormalizedRecord>, NormalizationError> {
                Ok(vec![])
            }
            async fn find_pending_stage(
                &self,
                _stage: Stage,
                _limit: u32,
            ) -> Result<Vec<normalizer_domain::NormalizedRecord>, NormalizationError> {
                Ok(vec![])
            }
            async fn count_by_processing_level(&self, _level: &str) -> Result<u64, NormalizationError> {
                Ok(0)
            }
        }
        struct NoopCatalog;
        #[async_trait]
        impl CatalogRepository for NoopCatalog {
            async fn save_catalog(&self, _catalog: &normalizer_domain::Catalog) -> Result<(), NormalizationError> {
                Ok(())
            }
            async fn find_catalog_by_name(
                &self,
                _upload_id: &normalizer_domain::UploadId,
                _name: &str,
            ) -> Result<Option<normalizer_domain::Catalog>, NormalizationError> {
                Ok(None)
            }
            async fn list_catalogs(
                &self,
                _upload_id: &normalizer_domain::UploadId,
            ) -> Result<Vec<normalizer_domain::Catalog>, NormalizationError> {
                Ok(vec![])
            }
            async fn save_item(&self, _item: &normalizer_domain::CatalogItem) -> Result<(), NormalizationError> {
                Ok(())
            }
            async fn list_items_page(
                &self,
                _upload_id: &normalizer_domain::UploadId,
                _catalog_ids: Option<&[normalizer_domain::CatalogId]>,
                _page: u32,
                _limit: u32,
            ) -> Result<normalizer_domain::repositories::catalog_repository::CatalogPage, NormalizationError> {
                Ok(normalizer_domain::repositories::catalog_repository::CatalogPage { items: vec![], total: 0 })
            }
            async fn find_item_by_reference(
                &self,
                _catalog_id: &normalizer_domain::CatalogId,
                _reference: &str,
            ) -> Result<Option<normalizer_domain::CatalogItem>, NormalizationError> {
                Ok(None)
            }
            async fn find_item_by_id(
                &self,
                _item_id: &normalizer_domain::CatalogItemId,
            ) -> Result<Option<normalizer_domain::CatalogItem>, NormalizationError> {
                Ok(None)
            }
        }

        ScoredDuplicateDetector::new(
            Arc::new(NoopRecords),
            Arc::new(NoopCatalog),
            Arc::new(WeightedHybridScorer::new()),
            Arc::new(StandardPhoneticEncoder::new()),
        )
    }

    #[test]
    fn evaluate_perfect_separation_yields_auc_one() {
        let detector = detector();
        let labeled = vec![pair(0.9, true), pair(0.8, true), pair(0.2, false), pair(0.1, false)];
        let report = detector.evaluate(&labeled);
        assert_eq!(report.precision, 1.0);
        assert_eq!(report.recall, 1.0);
        assert!((report.roc_auc - 1.0).abs() < 1e-9);
    }

    #[test]
    fn evaluate_empty_input_is_all_zero() {
        let detector = detector();
        let report = detector.evaluate(&[]);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.f1, 0.0);
    }
}
