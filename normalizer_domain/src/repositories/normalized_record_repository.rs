// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for the normalized-record wide table
//! (`spec.md` §3, §4.3). `save_stage` is the single-row atomic update
//! that callers must use instead of a whole-record rewrite, so that
//! invariant 2 (§8) holds at the storage layer too.

use async_trait::async_trait;

use crate::entities::normalized_record::NormalizedRecord;
use crate::{CatalogItemId, NormalizationError, NormalizedRecordId, Stage, StageOutcome};

#[async_trait]
pub trait NormalizedRecordRepository: Send + Sync {
    async fn save(&self, record: &NormalizedRecord) -> Result<(), NormalizationError>;

    async fn find_by_id(&self, id: &NormalizedRecordId) -> Result<Option<NormalizedRecord>, NormalizationError>;

    async fn find_by_catalog_item(
        &self,
        catalog_item_id: &CatalogItemId,
    ) -> Result<Option<NormalizedRecord>, NormalizationError>;

    /// Atomic single-stage column update (input/output/confidence/
    /// completed/completed_at together).
    async fn save_stage(
        &self,
        record_id: &NormalizedRecordId,
        stage: Stage,
        outcome: &StageOutcome,
    ) -> Result<(), NormalizationError>;

    /// Records lacking a code, for `POST /api/kpved/reclassify-hierarchical`.
    async fn find_without_code(&self, limit: u32) -> Result<Vec<NormalizedRecord>, NormalizationError>;

    async fn find_pending_stage(&self, stage: Stage, limit: u32) -> Result<Vec<NormalizedRecord>, NormalizationError>;

    async fn count_by_processing_level(&self, level: &str) -> Result<u64, NormalizationError>;
}
