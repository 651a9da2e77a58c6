// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared handles every route handler dispatches against. Built once
//! by `normalizer`'s `main.rs` composition root and cloned cheaply
//! (every field is an `Arc` or a small value type) into each request.

use std::sync::Arc;

use normalizer_domain::services::duplicate_detector::DuplicateDetectionConfig;

use crate::application::use_cases::{
    DetectDuplicatesUseCase, IngestUploadUseCase, ReclassifyHierarchicalUseCase, RetrieveCatalogUseCase, RunNormalizationUseCase,
};

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestUploadUseCase>,
    pub retrieve: Arc<RetrieveCatalogUseCase>,
    pub run_normalization: Arc<RunNormalizationUseCase>,
    pub reclassify: Arc<ReclassifyHierarchicalUseCase>,
    pub detect_duplicates: Arc<DetectDuplicatesUseCase>,
    /// Template for `POST /api/duplicates/detect`: `item_ids` is
    /// replaced per request, every other field comes from
    /// `AppConfig.duplicate_detection`.
    pub default_duplicate_config: DuplicateDetectionConfig,
    /// `spec.md` §6 `POST /api/kpved/reclassify-hierarchical`'s body
    /// only names `limit`; the confidence floor comes from
    /// `AppConfig.classifier.min_confidence`.
    pub default_reclassify_min_confidence: f64,
}
