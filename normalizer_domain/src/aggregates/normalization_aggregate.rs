// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Normalization Aggregate
//!
//! Wraps one [`NormalizedRecord`] as the consistency boundary for a
//! single pipeline pass: every mutation goes through the aggregate so
//! that the uncommitted-event list always matches what was actually
//! applied to the record, and a version counter gives repositories an
//! optimistic-concurrency check on the stage-column update (`spec.md`
//! §5 "single-writer-per-row").

use chrono::{DateTime, Utc};

use crate::entities::normalized_record::NormalizedRecord;
use crate::events::NormalizationEvent;
use crate::{Confidence, NormalizationError, ProcessingMethod, Stage, StageOutcome};

pub struct NormalizationAggregate {
    record: NormalizedRecord,
    version: u64,
    uncommitted_events: Vec<NormalizationEvent>,
}

impl NormalizationAggregate {
    pub fn new(record: NormalizedRecord) -> Self {
        Self { record, version: 0, uncommitted_events: Vec::new() }
    }

    pub fn record(&self) -> &NormalizedRecord {
        &self.record
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn uncommitted_events(&self) -> &[NormalizationEvent] {
        &self.uncommitted_events
    }

    pub fn mark_events_as_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    fn bump(&mut self, event: NormalizationEvent) {
        self.version += 1;
        self.uncommitted_events.push(event);
    }

    pub fn invalidate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.record.mark_invalid(reason.clone());
        self.bump(NormalizationEvent::RecordInvalidated {
            record_id: self.record.id().clone(),
            reason,
            at: Utc::now(),
        });
    }

    pub fn complete_stage(&mut self, stage: Stage, outcome: StageOutcome) -> Result<(), NormalizationError> {
        self.record.complete_stage(stage, outcome)?;
        self.bump(NormalizationEvent::StageCompleted { record_id: self.record.id().clone(), stage, at: Utc::now() });
        Ok(())
    }

    pub fn finalize_golden(
        &mut self,
        final_code: impl Into<String>,
        final_name: impl Into<String>,
        final_confidence: Confidence,
        final_processing_method: ProcessingMethod,
        final_completed_at: DateTime<Utc>,
    ) {
        let was_unset = self.record.golden().is_none();
        let final_code = final_code.into();
        self.record.finalize_golden(
            final_code.clone(),
            final_name,
            final_confidence,
            final_processing_method,
            final_completed_at,
        );
        if was_unset {
            self.bump(NormalizationEvent::GoldenRecordFinalized {
                record_id: self.record.id().clone(),
                final_code,
                processing_method: final_processing_method,
                at: final_completed_at,
            });
        }
    }

    pub fn require_manual_review(&mut self) {
        self.record.mark_manual_review();
        self.bump(NormalizationEvent::ManualReviewRequired { record_id: self.record.id().clone(), at: Utc::now() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogItemId, NormalizedRecord};

    #[test]
    fn mutations_accumulate_events_and_bump_version() {
        let mut aggregate = NormalizationAggregate::new(NormalizedRecord::new(CatalogItemId::new()));
        aggregate
            .complete_stage(Stage::PreCleanup, StageOutcome::complete("ok", Confidence::ONE, Utc::now()))
            .unwrap();
        assert_eq!(aggregate.version(), 1);
        assert_eq!(aggregate.uncommitted_events().len(), 1);

        aggregate.mark_events_as_committed();
        assert!(aggregate.uncommitted_events().is_empty());
        assert_eq!(aggregate.version(), 1);
    }

    #[test]
    fn finalize_golden_only_raises_event_on_first_write() {
        let mut aggregate = NormalizationAggregate::new(NormalizedRecord::new(CatalogItemId::new()));
        let now = Utc::now();
        aggregate.finalize_golden("01", "n", Confidence::ONE, ProcessingMethod::LmClassifier, now);
        aggregate.finalize_golden("02", "m", Confidence::ZERO, ProcessingMethod::ManualReview, now);
        assert_eq!(aggregate.uncommitted_events().len(), 1);
        assert_eq!(aggregate.record().golden().unwrap().final_code, "01");
    }
}
