// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Detect Duplicates Use Case
//!
//! Runs the [`DuplicateDetector`] over a batch of normalized records
//! and commits the resulting groups, computing the master-record
//! selection formula from `spec.md` §4.5:
//!
//! ```text
//! score = quality * 40
//!       + merged_count * 10
//!       + (benchmark ? 30 : ai_enhanced ? 20 : 0)
//!       + min(name_length / 2, 10)
//! ```
//!
//! with ties broken by lowest id.

use std::sync::Arc;

use tracing::{info, instrument};

use normalizer_domain::repositories::{CatalogRepository, GroupRepository, NormalizedRecordRepository};
use normalizer_domain::services::duplicate_detector::{DetectedGroup, DuplicateDetectionConfig, DuplicateDetector};
use normalizer_domain::{Group, NormalizationError, NormalizedRecordId};

pub struct DetectDuplicatesUseCase {
    records: Arc<dyn NormalizedRecordRepository>,
    catalog: Arc<dyn CatalogRepository>,
    groups: Arc<dyn GroupRepository>,
    detector: Arc<dyn DuplicateDetector>,
}

impl DetectDuplicatesUseCase {
    pub fn new(
        records: Arc<dyn NormalizedRecordRepository>,
        catalog: Arc<dyn CatalogRepository>,
        groups: Arc<dyn GroupRepository>,
        detector: Arc<dyn DuplicateDetector>,
    ) -> Self {
        Self { records, catalog, groups, detector }
    }

    #[instrument(skip(self, item_ids), fields(item_count = item_ids.len()))]
    pub async fn execute(
        &self,
        item_ids: &[NormalizedRecordId],
        config: &DuplicateDetectionConfig,
    ) -> Result<Vec<Group>, NormalizationError> {
        let detected = self.detector.detect(item_ids, config).await?;
        let mut committed = Vec::with_capacity(detected.len());

        for candidate in detected {
            let group = self.commit_group(candidate).await?;
            committed.push(group);
        }

        info!(groups = committed.len(), "duplicate detection pass committed");
        Ok(committed)
    }

    async fn commit_group(&self, detected: DetectedGroup) -> Result<Group, NormalizationError> {
        let mut group = Group::new("duplicate", detected.member_ids.iter().cloned());
        let master = self.select_master(&detected.member_ids, group.merged_count()).await?;
        group.set_master(master);
        self.groups.save(&group).await?;
        Ok(group)
    }

    /// Picks the highest-scoring member as master, ties broken by the
    /// lowest id (ULIDs sort lexicographically, so this is a plain
    /// minimum comparison).
    async fn select_master(&self, member_ids: &[NormalizedRecordId], merged_count: u32) -> Result<NormalizedRecordId, NormalizationError> {
        let mut best: Option<(f64, NormalizedRecordId)> = None;

        for member_id in member_ids {
            let Some(record) = self.records.find_by_id(member_id).await? else { continue };
            let Some(golden) = record.golden() else { continue };

            let name_length = match self.catalog.find_item_by_id(record.catalog_item_id()).await? {
                Some(item) => item.name().chars().count(),
                None => 0,
            };

            let quality = golden.final_confidence.value() * 40.0;
            let merge_bonus = merged_count as f64 * 10.0;
            let tier_bonus = golden.final_processing_method.quality_tier().master_selection_weight();
            let length_bonus = (name_length as f64 / 2.0).min(10.0);
            let score = quality + merge_bonus + tier_bonus + length_bonus;

            best = Some(match best {
                Some((best_score, ref best_id)) if best_score > score || (best_score == score && best_id < member_id) => {
                    (best_score, best_id.clone())
                }
                _ => (score, member_id.clone()),
            });
        }

        best.map(|(_, id)| id)
            .or_else(|| member_ids.first().cloned())
            .ok_or_else(|| NormalizationError::ValidationError("cannot select a master from an empty group".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use normalizer_domain::repositories::catalog_repository::CatalogPage;
    use normalizer_domain::services::duplicate_detector::{EvaluationReport, MatchReason};
    use normalizer_domain::services::text_toolkit::HybridWeights;
    use normalizer_domain::{
        Catalog, CatalogId, CatalogItem, CatalogItemId, Confidence, Constant, NormalizedRecord, OpaqueXml, ProcessingMethod, UploadId,
    };

    #[derive(Default)]
    struct FakeRecords {
        records: Mutex<HashMap<String, NormalizedRecord>>,
    }

    #[async_trait]
    impl NormalizedRecordRepository for FakeRecords {
        async fn save(&self, record: &NormalizedRecord) -> Result<(), NormalizationError> {
            self.records.lock().unwrap().insert(record.id().to_string(), record.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: &NormalizedRecordId) -> Result<Option<NormalizedRecord>, NormalizationError> {
            Ok(self.records.lock().unwrap().get(&id.to_string()).cloned())
        }
        async fn find_by_catalog_item(&self, catalog_item_id: &CatalogItemId) -> Result<Option<NormalizedRecord>, NormalizationError> {
            Ok(self.records.lock().unwrap().values().find(|r| r.catalog_item_id() == catalog_item_id).cloned())
        }
        async fn save_stage(
            &self,
            _record_id: &NormalizedRecordId,
            _stage: normalizer_domain::Stage,
            _outcome: &normalizer_domain::StageOutcome,
        ) -> Result<(), NormalizationError> {
            Ok(())
        }
        async fn find_without_code(&self, _limit: u32) -> Result<Vec<NormalizedRecord>, NormalizationError> {
            Ok(vec![])
        }
        async fn find_pending_stage(&self, _stage: normalizer_domain::Stage, _limit: u32) -> Result<Vec<NormalizedRecord>, NormalizationError> {
            Ok(vec![])
        }
        async fn count_by_processing_level(&self, _level: &str) -> Result<u64, NormalizationError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct FakeCatalogs {
        items: Mutex<HashMap<String, CatalogItem>>,
    }

    #[async_trait]
    impl CatalogRepository for FakeCatalogs {
        async fn save_catalog(&self, _catalog: &Catalog) -> Result<(), NormalizationError> {
            Ok(())
        }
        async fn find_catalog_by_name(&self, _upload_id: &UploadId, _name: &str) -> Result<Option<Catalog>, NormalizationError> {
            Ok(None)
        }
        async fn list_catalogs(&self, _upload_id: &UploadId) -> Result<Vec<Catalog>, NormalizationError> {
            Ok(vec![])
        }
        async fn save_item(&self, item: &CatalogItem) -> Result<(), NormalizationError> {
            self.items.lock().unwrap().insert(item.id().to_string(), item.clone());
            Ok(())
        }
        async fn list_items_page(
            &self,
            _upload_id: &UploadId,
            _catalog_ids: Option<&[CatalogId]>,
            _page: u32,
            _limit: u32,
        ) -> Result<CatalogPage, NormalizationError> {
            Ok(CatalogPage { items: vec![], total: 0 })
        }
        async fn find_item_by_reference(&self, _catalog_id: &CatalogId, _reference: &str) -> Result<Option<CatalogItem>, NormalizationError> {
            Ok(None)
        }
        async fn find_item_by_id(&self, item_id: &CatalogItemId) -> Result<Option<CatalogItem>, NormalizationError> {
            Ok(self.items.lock().unwrap().get(&item_id.to_string()).cloned())
        }
        async fn all_item_ids(&self, _upload_id: &UploadId) -> Result<Vec<String>, NormalizationError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeGroups {
        groups: Mutex<Vec<Group>>,
    }

    #[async_trait]
    impl GroupRepository for FakeGroups {
        async fn save(&self, group: &Group) -> Result<(), NormalizationError> {
            self.groups.lock().unwrap().push(group.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: &normalizer_domain::GroupId) -> Result<Option<Group>, NormalizationError> {
            Ok(self.groups.lock().unwrap().iter().find(|g| g.id() == id).cloned())
        }
        async fn find_by_member(&self, _item_id: &NormalizedRecordId) -> Result<Option<Group>, NormalizationError> {
            Ok(None)
        }
        async fn list_by_priority(&self, _limit: u32) -> Result<Vec<Group>, NormalizationError> {
            Ok(self.groups.lock().unwrap().clone())
        }
        async fn merge(&self, into: &normalizer_domain::GroupId, _from: &normalizer_domain::GroupId) -> Result<Group, NormalizationError> {
            self.groups.lock().unwrap().iter().find(|g| g.id() == into).cloned().ok_or_else(|| NormalizationError::RecordNotFound("group".into()))
        }
    }

    struct FakeDetector;

    #[async_trait]
    impl DuplicateDetector for FakeDetector {
        async fn detect(
            &self,
            items: &[NormalizedRecordId],
            _config: &DuplicateDetectionConfig,
        ) -> Result<Vec<DetectedGroup>, NormalizationError> {
            Ok(vec![DetectedGroup {
                member_ids: items.to_vec(),
                master_id: items[0].clone(),
                average_score: 1.0,
                reason: MatchReason::ExactByName,
            }])
        }
        fn evaluate(&self, _labeled_pairs: &[(normalizer_domain::services::duplicate_detector::DuplicateCandidatePair, bool)]) -> EvaluationReport {
            EvaluationReport::default()
        }
    }

    fn xml(s: &str) -> OpaqueXml {
        OpaqueXml::from_raw(s.to_string())
    }

    #[tokio::test]
    async fn selects_master_by_formula_not_insertion_order() {
        let records = Arc::new(FakeRecords::default());
        let catalogs = Arc::new(FakeCatalogs::default());
        let groups = Arc::new(FakeGroups::default());

        let item_low = CatalogItem::new(CatalogId::new(), "r1", None, "a", xml("<a/>"), xml("<t/>"));
        let item_high = CatalogItem::new(CatalogId::new(), "r2", None, "a much longer descriptive product name", xml("<a/>"), xml("<t/>"));
        catalogs.save_item(&item_low).await.unwrap();
        catalogs.save_item(&item_high).await.unwrap();

        let mut record_low = NormalizedRecord::new(item_low.id().clone());
        record_low.finalize_golden("01", "a", Confidence::new(0.5).unwrap(), ProcessingMethod::ManualReview, Utc::now());
        let mut record_high = NormalizedRecord::new(item_high.id().clone());
        record_high.finalize_golden("01", "a much longer descriptive product name", Confidence::new(0.99).unwrap(), ProcessingMethod::Benchmark, Utc::now());

        records.save(&record_low).await.unwrap();
        records.save(&record_high).await.unwrap();

        let use_case = DetectDuplicatesUseCase::new(records, catalogs, groups, Arc::new(FakeDetector));
        let config = DuplicateDetectionConfig {
            algorithms: vec![],
            threshold: 0.8,
            merge_overlapping: true,
            max_items: 1000,
            weights: HybridWeights::default(),
        };

        let committed = use_case.execute(&[record_low.id().clone(), record_high.id().clone()], &config).await.unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].master_item_id(), Some(record_high.id()));
    }
}
