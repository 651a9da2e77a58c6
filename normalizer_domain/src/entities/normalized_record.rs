// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Normalized Record
//!
//! One row per catalog item in the normalization-target table, carrying
//! a dense set of per-stage columns (`spec.md` §3, §4.3). The entity
//! enforces, at the API level, the three invariants from §8:
//!
//! 1. monotonic stages — completing stage N requires every prior stage
//!    on the dependency chain to already be completed;
//! 2. atomic stage writes — [`crate::StageOutcome::complete`] is the
//!    only way to populate output columns, so a completed stage always
//!    carries output;
//! 3. golden fields are written exactly once per pipeline pass — see
//!    [`NormalizedRecord::finalize_golden`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{CatalogItemId, Confidence, NormalizationError, NormalizedRecordId, ProcessingMethod, Stage, StageOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenFields {
    pub final_code: String,
    pub final_name: String,
    pub final_confidence: Confidence,
    pub final_processing_method: ProcessingMethod,
    pub final_completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    id: NormalizedRecordId,
    catalog_item_id: CatalogItemId,
    stages: HashMap<Stage, StageOutcome>,
    golden: Option<GoldenFields>,
    is_valid: bool,
    invalid_reason: Option<String>,
    manual_review_required: bool,
    ai_response_raw: Option<String>,
}

impl NormalizedRecord {
    pub fn new(catalog_item_id: CatalogItemId) -> Self {
        let stages = Stage::ALL.iter().map(|s| (*s, StageOutcome::pending())).collect();
        Self {
            id: NormalizedRecordId::new(),
            catalog_item_id,
            stages,
            golden: None,
            is_valid: true,
            invalid_reason: None,
            manual_review_required: false,
            ai_response_raw: None,
        }
    }

    /// Rebuilds a record from already-persisted state, preserving its
    /// original id and per-stage/golden/validity state. Repository
    /// implementations use this instead of [`NormalizedRecord::new`] so
    /// reloading a row doesn't reset every stage back to pending.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: NormalizedRecordId,
        catalog_item_id: CatalogItemId,
        stages: HashMap<Stage, StageOutcome>,
        golden: Option<GoldenFields>,
        is_valid: bool,
        invalid_reason: Option<String>,
        manual_review_required: bool,
        ai_response_raw: Option<String>,
    ) -> Self {
        Self { id, catalog_item_id, stages, golden, is_valid, invalid_reason, manual_review_required, ai_response_raw }
    }

    pub fn id(&self) -> &NormalizedRecordId {
        &self.id
    }

    pub fn catalog_item_id(&self) -> &CatalogItemId {
        &self.catalog_item_id
    }

    pub fn stage(&self, stage: Stage) -> &StageOutcome {
        self.stages.get(&stage).expect("every Stage has an entry from construction")
    }

    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        self.stage(stage).completed
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn invalid_reason(&self) -> Option<&str> {
        self.invalid_reason.as_deref()
    }

    pub fn manual_review_required(&self) -> bool {
        self.manual_review_required
    }

    pub fn golden(&self) -> Option<&GoldenFields> {
        self.golden.as_ref()
    }

    pub fn ai_response_raw(&self) -> Option<&str> {
        self.ai_response_raw.as_deref()
    }

    /// Pre-cleanup (stage 0.5) rejection. Downstream stages are never
    /// run for an invalid record; it stays visible for audit (`spec.md`
    /// §4.3 "Pre-cleanup").
    pub fn mark_invalid(&mut self, reason: impl Into<String>) {
        self.is_valid = false;
        self.invalid_reason = Some(reason.into());
    }

    pub fn mark_manual_review(&mut self) {
        self.manual_review_required = true;
    }

    pub fn set_ai_response_raw(&mut self, raw: impl Into<String>) {
        self.ai_response_raw = Some(raw.into());
    }

    /// Completes one stage, after checking every stage in
    /// `stage.prior_stages()` is already completed (invariant 1, §8).
    pub fn complete_stage(&mut self, stage: Stage, outcome: StageOutcome) -> Result<(), NormalizationError> {
        if !outcome.completed {
            return Err(NormalizationError::StateViolation(format!(
                "complete_stage called with a non-completed outcome for {stage}"
            )));
        }
        for prior in stage.prior_stages() {
            if !self.is_stage_completed(*prior) {
                return Err(NormalizationError::StateViolation(format!(
                    "cannot complete {stage}: prerequisite {prior} is not completed"
                )));
            }
        }
        self.stages.insert(stage, outcome);
        Ok(())
    }

    /// Records a failed attempt at a stage without completing it —
    /// used by the pipeline's per-record failure policy (`spec.md` §7:
    /// "a per-record failure is logged, the record's stage is marked
    /// failed with reason, and the next record proceeds").
    pub fn record_stage_failure(&mut self, stage: Stage, reason: impl Into<String>) {
        let entry = self.stages.entry(stage).or_insert_with(StageOutcome::pending);
        entry.diagnostic = Some(reason.into());
    }

    /// Writes the golden fields. First completion wins: once set, later
    /// calls are no-ops, since the source behavior around
    /// re-classification overwrites was ambiguous (`spec.md` §9 open
    /// question) and this implementation preserves the first pass.
    pub fn finalize_golden(
        &mut self,
        final_code: impl Into<String>,
        final_name: impl Into<String>,
        final_confidence: Confidence,
        final_processing_method: ProcessingMethod,
        final_completed_at: DateTime<Utc>,
    ) {
        if self.golden.is_some() {
            return;
        }
        self.golden = Some(GoldenFields {
            final_code: final_code.into(),
            final_name: final_name.into(),
            final_confidence,
            final_processing_method,
            final_completed_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_outcome() -> StageOutcome {
        StageOutcome::complete("out", Confidence::new(0.8).unwrap(), Utc::now())
    }

    #[test]
    fn completing_out_of_order_fails() {
        let mut record = NormalizedRecord::new(CatalogItemId::new());
        let err = record.complete_stage(Stage::NameNormalization, completed_outcome());
        assert!(matches!(err, Err(NormalizationError::StateViolation(_))));
    }

    #[test]
    fn completing_in_order_succeeds() {
        let mut record = NormalizedRecord::new(CatalogItemId::new());
        record.complete_stage(Stage::PreCleanup, completed_outcome()).unwrap();
        record.complete_stage(Stage::NameNormalization, completed_outcome()).unwrap();
        assert!(record.is_stage_completed(Stage::NameNormalization));
    }

    #[test]
    fn golden_fields_set_exactly_once() {
        let mut record = NormalizedRecord::new(CatalogItemId::new());
        let now = Utc::now();
        record.finalize_golden("01.02", "widget", Confidence::ONE, ProcessingMethod::LmClassifier, now);
        record.finalize_golden("99.99", "other", Confidence::ZERO, ProcessingMethod::ManualReview, now);
        assert_eq!(record.golden().unwrap().final_code, "01.02");
    }

    #[test]
    fn invalid_record_keeps_audit_trail() {
        let mut record = NormalizedRecord::new(CatalogItemId::new());
        record.mark_invalid("empty name");
        assert!(!record.is_valid());
        assert_eq!(record.invalid_reason(), Some("empty name"));
    }
}
