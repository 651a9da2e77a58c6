// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Which pipeline stage produced a record's golden fields, and the
//! coarse quality tier that feeds master-record selection
//! (`spec.md` §4.5's `processing_level` term).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMethod {
    Benchmark,
    KeywordClassifier,
    HierarchicalClassifier,
    LmClassifier,
    ManualReview,
}

/// The three-tier quality bucket used in the master-selection formula:
/// `processing_level == "benchmark" ? 30 : processing_level ==
/// "ai_enhanced" ? 20 : 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingLevel {
    Benchmark,
    AiEnhanced,
    Other,
}

impl ProcessingMethod {
    pub fn quality_tier(&self) -> ProcessingLevel {
        match self {
            ProcessingMethod::Benchmark => ProcessingLevel::Benchmark,
            ProcessingMethod::KeywordClassifier
            | ProcessingMethod::HierarchicalClassifier
            | ProcessingMethod::LmClassifier => ProcessingLevel::AiEnhanced,
            ProcessingMethod::ManualReview => ProcessingLevel::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::Benchmark => "benchmark",
            ProcessingMethod::KeywordClassifier => "keyword_classifier",
            ProcessingMethod::HierarchicalClassifier => "hierarchical_classifier",
            ProcessingMethod::LmClassifier => "lm_classifier",
            ProcessingMethod::ManualReview => "manual_review",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "benchmark" => Some(ProcessingMethod::Benchmark),
            "keyword_classifier" => Some(ProcessingMethod::KeywordClassifier),
            "hierarchical_classifier" => Some(ProcessingMethod::HierarchicalClassifier),
            "lm_classifier" => Some(ProcessingMethod::LmClassifier),
            "manual_review" => Some(ProcessingMethod::ManualReview),
            _ => None,
        }
    }
}

impl ProcessingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingLevel::Benchmark => "benchmark",
            ProcessingLevel::AiEnhanced => "ai_enhanced",
            ProcessingLevel::Other => "other",
        }
    }
}

impl ProcessingLevel {
    pub fn master_selection_weight(&self) -> f64 {
        match self {
            ProcessingLevel::Benchmark => 30.0,
            ProcessingLevel::AiEnhanced => 20.0,
            ProcessingLevel::Other => 0.0,
        }
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
