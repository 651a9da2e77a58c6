// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reclassify Hierarchical Use Case
//!
//! `spec.md` §6 `POST /api/kpved/reclassify-hierarchical`: re-runs the
//! hierarchical classifier over records that still lack a code,
//! writing golden fields on success and leaving the record untouched
//! (for a later pass) on failure.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use normalizer_domain::repositories::NormalizedRecordRepository;
use normalizer_domain::services::hierarchical_classifier::HierarchicalClassifier;
use normalizer_domain::{NormalizationError, ProcessingMethod};

#[derive(Debug, Default, Clone)]
pub struct ReclassifySummary {
    pub attempted: u64,
    pub reclassified: u64,
    pub left_pending: u64,
}

pub struct ReclassifyHierarchicalUseCase {
    records: Arc<dyn NormalizedRecordRepository>,
    classifier: Arc<dyn HierarchicalClassifier>,
}

impl ReclassifyHierarchicalUseCase {
    pub fn new(records: Arc<dyn NormalizedRecordRepository>, classifier: Arc<dyn HierarchicalClassifier>) -> Self {
        Self { records, classifier }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, limit: u32, min_confidence: f64) -> Result<ReclassifySummary, NormalizationError> {
        let mut pending = self.records.find_without_code(limit).await?;
        let mut summary = ReclassifySummary::default();

        for record in pending.iter_mut() {
            summary.attempted += 1;

            let normalized_name = record
                .stage(normalizer_domain::Stage::NameNormalization)
                .output
                .clone()
                .unwrap_or_default();
            let category = record.stage(normalizer_domain::Stage::GoodsVsService).output.clone().unwrap_or_default();

            match self.classifier.classify(&normalized_name, &category, CancellationToken::new()).await {
                Ok(result) if result.final_confidence.meets(min_confidence) => {
                    record.finalize_golden(
                        result.final_code,
                        result.final_name,
                        result.final_confidence,
                        ProcessingMethod::HierarchicalClassifier,
                        Utc::now(),
                    );
                    self.records.save(record).await?;
                    summary.reclassified += 1;
                }
                Ok(_) => {
                    record.mark_manual_review();
                    self.records.save(record).await?;
                    summary.left_pending += 1;
                }
                Err(err) => {
                    warn!(record_id = %record.id(), %err, "hierarchical reclassification failed");
                    summary.left_pending += 1;
                }
            }
        }

        info!(attempted = summary.attempted, reclassified = summary.reclassified, "reclassification pass complete");
        Ok(summary)
    }
}
