// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Duplicate-detection engine contract (`spec.md` §4.5). Detection
//! itself is a read-only bulk compute; only a committed merge mutates
//! groups.

use async_trait::async_trait;

use crate::services::text_toolkit::HybridWeights;
use crate::{NormalizationError, NormalizedRecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAlgorithm {
    ExactByCode,
    ExactByName,
    Fuzzy,
    Phonetic,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct DuplicateDetectionConfig {
    pub algorithms: Vec<MatchAlgorithm>,
    pub threshold: f64,
    pub merge_overlapping: bool,
    pub max_items: usize,
    pub weights: HybridWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    ExactByCode,
    ExactByName,
    Fuzzy,
    Phonetic,
    Semantic,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::ExactByCode => "exact by code",
            MatchReason::ExactByName => "exact by name",
            MatchReason::Fuzzy => "fuzzy ≥ τ",
            MatchReason::Phonetic => "phonetic match",
            MatchReason::Semantic => "semantic ≥ τ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DuplicateCandidatePair {
    pub left: NormalizedRecordId,
    pub right: NormalizedRecordId,
    pub score: f64,
    pub reason: MatchReason,
}

#[derive(Debug, Clone)]
pub struct DetectedGroup {
    pub member_ids: Vec<NormalizedRecordId>,
    pub master_id: NormalizedRecordId,
    pub average_score: f64,
    pub reason: MatchReason,
}

#[async_trait]
pub trait DuplicateDetector: Send + Sync {
    /// (1) exact groups, (2) candidate generation via
    /// phonetic/prefix keys when `|items| > 500`, (3) hybrid scoring,
    /// (4) transitive closure into connected components.
    async fn detect(
        &self,
        items: &[NormalizedRecordId],
        config: &DuplicateDetectionConfig,
    ) -> Result<Vec<DetectedGroup>, NormalizationError>;

    /// Precision/recall/F1/Jaccard/ROC-AUC against a labeled set of
    /// pairs, for threshold tuning via grid search (`spec.md` §4.5
    /// "Evaluation").
    fn evaluate(&self, labeled_pairs: &[(DuplicateCandidatePair, bool)]) -> EvaluationReport;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub jaccard: f64,
    pub roc_auc: f64,
}
