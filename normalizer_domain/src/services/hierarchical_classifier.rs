// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Hierarchical LM classifier contract (`spec.md` §4.6). The classifier
//! descends at most [`CodeLevel::DESCENT_ORDER`]`.len()` == 4 levels
//! and stops early when a step's confidence falls below
//! `min_confidence` (default `0.7`).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{CodeLevel, Confidence, NormalizationError};

#[derive(Debug, Clone)]
pub struct ClassificationStep {
    pub level: CodeLevel,
    pub code: String,
    pub name: String,
    pub confidence: Confidence,
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub struct HierarchicalResult {
    pub final_code: String,
    pub final_name: String,
    pub final_confidence: Confidence,
    pub steps: Vec<ClassificationStep>,
    pub total_duration_ms: u64,
    pub cache_hits: u32,
    pub ai_calls_count: u32,
}

#[async_trait]
pub trait HierarchicalClassifier: Send + Sync {
    /// `category` disambiguates the cache/dictionary key
    /// (`normalizedName|category`, `spec.md` §4.6).
    async fn classify(
        &self,
        normalized_name: &str,
        category: &str,
        cancel: CancellationToken,
    ) -> Result<HierarchicalResult, NormalizationError>;

    /// Invalidates the three-tier cache; called on classifier-data
    /// changes (`spec.md` §5 "Shared-resource policy").
    fn invalidate_caches(&self);
}

/// The keyword classifier's fast path: a learned `rootWord -> (code,
/// name, confidence)` dictionary that bypasses the LM descent entirely
/// on a hit.
pub trait KeywordClassifier: Send + Sync {
    fn lookup(&self, root_word: &str) -> Option<ClassificationStep>;

    /// Online learning: populated whenever a hierarchical descent
    /// completes with `final_confidence > 0.9` (`spec.md` §4.6). Gated
    /// under a single lock so readers see a consistent snapshot
    /// (`spec.md` §9 "Cyclic-graph avoidance").
    fn learn(&self, root_word: &str, step: ClassificationStep);
}
