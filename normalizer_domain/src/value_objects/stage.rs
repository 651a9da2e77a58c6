// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Stage
//!
//! The 14-stage normalization state machine (`spec.md` §4.3). Stage
//! ordinals keep the fractional numbering from the spec (`0.5`, `3.5`,
//! `6.5`) so `prior_stages` can express the strict dependency chain on
//! the main path without a second lookup table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Stage {
    PreCleanup,             // 0.5
    NameNormalization,      // 1
    GoodsVsService,         // 2
    AttributeExtraction,    // 2.5
    InitialGrouping,        // 3
    ClusterRefinement,      // 3.5
    ArticleCodeExtraction,  // 4
    DimensionExtraction,    // 5
    KeywordClassification,  // 6
    HierarchicalRefinement, // 6.5
    LmClassification,       // 7
    FallbackReview,         // 8
    FinalValidation,        // 9
    ExportFlag,             // 10
}

impl Stage {
    pub const ALL: [Stage; 14] = [
        Stage::PreCleanup,
        Stage::NameNormalization,
        Stage::GoodsVsService,
        Stage::AttributeExtraction,
        Stage::InitialGrouping,
        Stage::ClusterRefinement,
        Stage::ArticleCodeExtraction,
        Stage::DimensionExtraction,
        Stage::KeywordClassification,
        Stage::HierarchicalRefinement,
        Stage::LmClassification,
        Stage::FallbackReview,
        Stage::FinalValidation,
        Stage::ExportFlag,
    ];

    /// The fractional ordinal used in the spec, e.g. `6.5` for
    /// `HierarchicalRefinement`. Used for diagnostics/logging, not for
    /// dependency checks (use [`Stage::prior_stages`] for that).
    pub fn ordinal(&self) -> f32 {
        match self {
            Stage::PreCleanup => 0.5,
            Stage::NameNormalization => 1.0,
            Stage::GoodsVsService => 2.0,
            Stage::AttributeExtraction => 2.5,
            Stage::InitialGrouping => 3.0,
            Stage::ClusterRefinement => 3.5,
            Stage::ArticleCodeExtraction => 4.0,
            Stage::DimensionExtraction => 5.0,
            Stage::KeywordClassification => 6.0,
            Stage::HierarchicalRefinement => 6.5,
            Stage::LmClassification => 7.0,
            Stage::FallbackReview => 8.0,
            Stage::FinalValidation => 9.0,
            Stage::ExportFlag => 10.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::PreCleanup => "pre_cleanup",
            Stage::NameNormalization => "name_normalization",
            Stage::GoodsVsService => "goods_vs_service",
            Stage::AttributeExtraction => "attribute_extraction",
            Stage::InitialGrouping => "initial_grouping",
            Stage::ClusterRefinement => "cluster_refinement",
            Stage::ArticleCodeExtraction => "article_code_extraction",
            Stage::DimensionExtraction => "dimension_extraction",
            Stage::KeywordClassification => "keyword_classification",
            Stage::HierarchicalRefinement => "hierarchical_refinement",
            Stage::LmClassification => "lm_classification",
            Stage::FallbackReview => "fallback_review",
            Stage::FinalValidation => "final_validation",
            Stage::ExportFlag => "export_flag",
        }
    }

    /// Every stage that must already be `completed` before this stage may
    /// run, on the main path (invariant 1 in `spec.md` §8). `6.5` depends
    /// only on `6` (it is a refinement, not a strict successor of `5`'s
    /// whole chain being re-walked), and `8` is only reached once `7` has
    /// run (whether or not it produced an acceptable output).
    pub fn prior_stages(&self) -> &'static [Stage] {
        use Stage::*;
        match self {
            PreCleanup => &[],
            NameNormalization => &[PreCleanup],
            GoodsVsService => &[PreCleanup, NameNormalization],
            AttributeExtraction => &[PreCleanup, NameNormalization, GoodsVsService],
            InitialGrouping => &[PreCleanup, NameNormalization, GoodsVsService, AttributeExtraction],
            ClusterRefinement => {
                &[PreCleanup, NameNormalization, GoodsVsService, AttributeExtraction, InitialGrouping]
            }
            ArticleCodeExtraction => {
                &[PreCleanup, NameNormalization, GoodsVsService, AttributeExtraction, InitialGrouping]
            }
            DimensionExtraction => &[
                PreCleanup,
                NameNormalization,
                GoodsVsService,
                AttributeExtraction,
                InitialGrouping,
                ArticleCodeExtraction,
            ],
            KeywordClassification => &[
                PreCleanup,
                NameNormalization,
                GoodsVsService,
                AttributeExtraction,
                InitialGrouping,
                ArticleCodeExtraction,
                DimensionExtraction,
            ],
            HierarchicalRefinement => &[KeywordClassification],
            LmClassification => &[KeywordClassification],
            FallbackReview => &[LmClassification],
            FinalValidation => &[FallbackReview],
            ExportFlag => &[FinalValidation],
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).expect("Stage::ALL is exhaustive")
    }

    /// Inverse of [`Stage::name`], for parsing the stage column back out
    /// of storage.
    pub fn from_name(name: &str) -> Option<Stage> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.ordinal())
    }
}

/// The wide-row column group for one stage of one record: input, output,
/// confidence, completion flag, and timestamp, matching the teacher's
/// per-field entity style rather than a single JSON blob (`spec.md` §9
/// discusses this as an explicit, permitted design choice).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StageOutcome {
    pub input: Option<String>,
    pub output: Option<String>,
    pub confidence: Option<Confidence>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Free-form diagnostic text (failure reason, LM raw response, etc).
    pub diagnostic: Option<String>,
}

impl StageOutcome {
    pub fn pending() -> Self {
        Self::default()
    }

    /// Marks the stage complete. This is the only way to set `completed`
    /// to true, so it is impossible to construct a `StageOutcome` with
    /// `completed=true` and no `output` — enforcing invariant 2 in
    /// `spec.md` §8 ("atomic stage writes") at the type level.
    pub fn complete(output: impl Into<String>, confidence: Confidence, completed_at: DateTime<Utc>) -> Self {
        Self {
            input: None,
            output: Some(output.into()),
            confidence: Some(confidence),
            completed: true,
            completed_at: Some(completed_at),
            diagnostic: None,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_stages_chain_is_strictly_increasing_in_ordinal() {
        for stage in Stage::ALL {
            for prior in stage.prior_stages() {
                assert!(prior.ordinal() < stage.ordinal(), "{stage} depends on {prior} out of order");
            }
        }
    }

    #[test]
    fn completed_outcome_always_has_output_and_timestamp() {
        let outcome = StageOutcome::complete("кабель ввг", Confidence::new(0.92).unwrap(), Utc::now());
        assert!(outcome.completed);
        assert!(outcome.output.is_some());
        assert!(outcome.completed_at.is_some());
    }

    #[test]
    fn pending_outcome_is_not_completed() {
        let outcome = StageOutcome::pending();
        assert!(!outcome.completed);
        assert!(outcome.output.is_none());
    }
}
