// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Events for the normalization pipeline's aggregate. Simplified from a
//! fully generic `DomainEvent<T>` envelope to a flat enum: every event
//! already carries its own id/timestamp fields, which is all this
//! system's provenance trail (`spec.md` §1) needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GroupId, NormalizedRecordId, ProcessingMethod, Stage, UploadId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NormalizationEvent {
    UploadCompleted {
        upload_id: UploadId,
        at: DateTime<Utc>,
    },
    RecordInvalidated {
        record_id: NormalizedRecordId,
        reason: String,
        at: DateTime<Utc>,
    },
    StageCompleted {
        record_id: NormalizedRecordId,
        stage: Stage,
        at: DateTime<Utc>,
    },
    GoldenRecordFinalized {
        record_id: NormalizedRecordId,
        final_code: String,
        processing_method: ProcessingMethod,
        at: DateTime<Utc>,
    },
    GroupMerged {
        into: GroupId,
        from: GroupId,
        new_size: usize,
        at: DateTime<Utc>,
    },
    ManualReviewRequired {
        record_id: NormalizedRecordId,
        at: DateTime<Utc>,
    },
}

impl NormalizationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NormalizationEvent::UploadCompleted { .. } => "upload_completed",
            NormalizationEvent::RecordInvalidated { .. } => "record_invalidated",
            NormalizationEvent::StageCompleted { .. } => "stage_completed",
            NormalizationEvent::GoldenRecordFinalized { .. } => "golden_record_finalized",
            NormalizationEvent::GroupMerged { .. } => "group_merged",
            NormalizationEvent::ManualReviewRequired { .. } => "manual_review_required",
        }
    }
}
