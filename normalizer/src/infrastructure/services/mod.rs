// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete implementations of the `normalizer_domain` service
//! contracts: the algorithmic text toolkit, duplicate detection, the
//! hierarchical classifier, the benchmark store, and schema detection.

pub mod benchmark_store_impl;
pub mod duplicate_detector_impl;
pub mod hierarchical_classifier_impl;
pub mod name_normalizer_impl;
pub mod structure_detector_impl;
pub mod text_toolkit_impl;

pub use benchmark_store_impl::CachedBenchmarkStore;
pub use duplicate_detector_impl::ScoredDuplicateDetector;
pub use hierarchical_classifier_impl::{LearningKeywordClassifier, LmHierarchicalClassifier};
pub use name_normalizer_impl::RegexNameNormalizer;
pub use structure_detector_impl::HeuristicStructureDetector;
pub use text_toolkit_impl::{SnowballStemmer, StandardPhoneticEncoder, StrsimEditDistances, UnicodeTokenizer, WeightedHybridScorer};
