// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retrieve Catalog Use Case
//!
//! Implements the paged retrieval envelope, the streaming variant, and
//! the verification endpoint from `spec.md` §4.2. For entity type
//! `all`, constants precede catalog items and both subsequences
//! preserve their own id order; pagination is applied to the
//! concatenated virtual list, not to either subsequence independently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use normalizer_domain::repositories::catalog_repository::RetrievalEntityType;
use normalizer_domain::repositories::{CatalogRepository, UploadRepository};
use normalizer_domain::{Catalog, CatalogId, CatalogItem, Constant, NormalizationError, Upload, UploadId};

/// Hard ceiling on page size (`spec.md` §4.2).
pub const MAX_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone)]
pub struct RetrievalPage {
    pub upload_uuid: UploadId,
    pub entity_type: RetrievalEntityType,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub constants: Vec<Constant>,
    pub items: Vec<CatalogItem>,
}

pub struct RetrieveCatalogUseCase {
    uploads: Arc<dyn UploadRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl RetrieveCatalogUseCase {
    pub fn new(uploads: Arc<dyn UploadRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { uploads, catalog }
    }

    /// Resolves an optional catalog-name allow-list into catalog ids
    /// scoped to this upload, so retrieval never leaks catalogs from
    /// other uploads.
    async fn resolve_catalog_ids(&self, upload_id: &UploadId, names: Option<&[String]>) -> Result<Option<Vec<CatalogId>>, NormalizationError> {
        let Some(names) = names else { return Ok(None) };
        let all: Vec<Catalog> = self.catalog.list_catalogs(upload_id).await?;
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(Some(all.into_iter().filter(|c| wanted.contains(c.name())).map(|c| c.id().clone()).collect()))
    }

    /// `spec.md` §6 `GET /api/uploads/{uuid}`.
    pub async fn find_upload(&self, upload_id: &UploadId) -> Result<Upload, NormalizationError> {
        self.uploads.find_by_id(upload_id).await?.ok_or_else(|| NormalizationError::UploadNotFound(upload_id.to_string()))
    }

    /// `spec.md` §6 `GET /api/uploads`.
    pub async fn list_uploads(&self) -> Result<Vec<Upload>, NormalizationError> {
        self.uploads.list_all().await
    }

    /// Serves one page of `spec.md` §4.2's paged XML envelope.
    /// `limit` is clamped to [`MAX_PAGE_LIMIT`]; `page` is 1-indexed.
    pub async fn retrieve_page(
        &self,
        upload_id: &UploadId,
        entity_type: RetrievalEntityType,
        catalog_names: Option<&[String]>,
        page: u32,
        limit: u32,
    ) -> Result<RetrievalPage, NormalizationError> {
        let page = page.max(1);
        let limit = limit.min(MAX_PAGE_LIMIT).max(1);

        self.uploads
            .find_by_id(upload_id)
            .await?
            .ok_or_else(|| NormalizationError::UploadNotFound(upload_id.to_string()))?;

        let catalog_ids = self.resolve_catalog_ids(upload_id, catalog_names).await?;

        match entity_type {
            RetrievalEntityType::Constants => {
                let all_constants = self.uploads.list_constants(upload_id).await?;
                let total = all_constants.len() as u64;
                let constants = paginate(all_constants, page, limit);
                Ok(RetrievalPage { upload_uuid: upload_id.clone(), entity_type, page, limit, total, constants, items: vec![] })
            }
            RetrievalEntityType::Catalogs => {
                let result = self.catalog.list_items_page(upload_id, catalog_ids.as_deref(), page, limit).await?;
                Ok(RetrievalPage {
                    upload_uuid: upload_id.clone(),
                    entity_type,
                    page,
                    limit,
                    total: result.total,
                    constants: vec![],
                    items: result.items,
                })
            }
            RetrievalEntityType::All => self.retrieve_concatenated_page(upload_id, catalog_ids.as_deref(), page, limit).await,
        }
    }

    /// `all`: constants form the head of a virtual list, catalog items
    /// the tail; both keep their own insertion order. Page boundaries
    /// are computed against the concatenation, so a page can straddle
    /// the constants/items boundary. The item side is assembled by
    /// walking every [`MAX_PAGE_LIMIT`]-sized repository page until the
    /// repository's own `total` is reached, so an upload with more
    /// items than one page holds still produces a correct concatenated
    /// total and a complete in-memory superset to window over.
    async fn retrieve_concatenated_page(
        &self,
        upload_id: &UploadId,
        catalog_ids: Option<&[CatalogId]>,
        page: u32,
        limit: u32,
    ) -> Result<RetrievalPage, NormalizationError> {
        let all_constants = self.uploads.list_constants(upload_id).await?;
        let all_items = self.fetch_all_items(upload_id, catalog_ids).await?;

        let total = (all_constants.len() + all_items.len()) as u64;
        let offset = (page as u64 - 1) * limit as u64;

        let mut constants = Vec::new();
        let mut items = Vec::new();
        let mut emitted = 0u64;
        let mut skipped = 0u64;

        for constant in all_constants {
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if emitted >= limit as u64 {
                break;
            }
            constants.push(constant);
            emitted += 1;
        }
        if emitted < limit as u64 {
            for item in all_items {
                if skipped < offset {
                    skipped += 1;
                    continue;
                }
                if emitted >= limit as u64 {
                    break;
                }
                items.push(item);
                emitted += 1;
            }
        }

        Ok(RetrievalPage { upload_uuid: upload_id.clone(), entity_type: RetrievalEntityType::All, page, limit, total, constants, items })
    }

    /// Walks the repository's real pages, in [`MAX_PAGE_LIMIT`]-sized
    /// chunks, until its `total` is reached, returning every item for
    /// this upload (optionally scoped to `catalog_ids`) rather than
    /// just the first page.
    async fn fetch_all_items(&self, upload_id: &UploadId, catalog_ids: Option<&[CatalogId]>) -> Result<Vec<CatalogItem>, NormalizationError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let fetched = self.catalog.list_items_page(upload_id, catalog_ids, page, MAX_PAGE_LIMIT).await?;
            let fetched_count = fetched.items.len();
            items.extend(fetched.items);
            if fetched_count == 0 || items.len() as u64 >= fetched.total {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// `spec.md` §6 `POST /api/uploads/{uuid}/verify`: diffs a
    /// client-asserted id set against what is actually persisted,
    /// returning the subset the client claims but that is missing.
    pub async fn verify_missing_ids(&self, upload_id: &UploadId, asserted_ids: &[String]) -> Result<Vec<String>, NormalizationError> {
        let persisted: HashSet<String> = self.catalog.all_item_ids(upload_id).await?.into_iter().collect();
        Ok(asserted_ids.iter().filter(|id| !persisted.contains(*id)).cloned().collect())
    }

    /// Full report backing `POST /api/uploads/{uuid}/verify`'s response
    /// envelope `{expected_total, received_count, missing_ids,
    /// is_complete, message}`.
    pub async fn verify(&self, upload_id: &UploadId, received_ids: &[String]) -> Result<VerifyReport, NormalizationError> {
        let persisted: HashSet<String> = self.catalog.all_item_ids(upload_id).await?.into_iter().collect();
        let missing_ids: Vec<String> = persisted.iter().filter(|id| !received_ids.contains(id)).cloned().collect();
        let expected_total = persisted.len() as u64;
        let received_count = received_ids.len() as u64;
        let is_complete = missing_ids.is_empty() && received_count == expected_total;
        Ok(VerifyReport { expected_total, received_count, missing_ids, is_complete })
    }

    /// Resolves an upload's catalog ids and flattens their item ids,
    /// for handlers that need to build a normalization batch from an
    /// entire upload.
    pub async fn all_item_ids(&self, upload_id: &UploadId) -> Result<Vec<String>, NormalizationError> {
        self.catalog.all_item_ids(upload_id).await
    }

    /// Builds an id→name lookup for this upload's catalogs, so callers
    /// rendering catalog items can always populate `catalog_name`
    /// (`spec.md` §6: "catalog_name ALWAYS populated on catalog items").
    pub async fn catalog_name_map(&self, upload_id: &UploadId) -> Result<HashMap<CatalogId, String>, NormalizationError> {
        let catalogs = self.catalog.list_catalogs(upload_id).await?;
        Ok(catalogs.into_iter().map(|c| (c.id().clone(), c.name().to_string())).collect())
    }
}

/// `spec.md` §6 `POST /api/uploads/{uuid}/verify` response shape.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub expected_total: u64,
    pub received_count: u64,
    pub missing_ids: Vec<String>,
    pub is_complete: bool,
}

fn paginate<T>(all: Vec<T>, page: u32, limit: u32) -> Vec<T> {
    let offset = (page as usize - 1) * limit as usize;
    all.into_iter().skip(offset).take(limit as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use normalizer_domain::repositories::catalog_repository::CatalogPage;
    use normalizer_domain::{OpaqueXml, Upload};

    #[derive(Default)]
    struct FakeUploads {
        uploads: Mutex<HashMap<String, Upload>>,
        constants: Mutex<Vec<Constant>>,
    }

    #[async_trait]
    impl UploadRepository for FakeUploads {
        async fn save(&self, upload: &Upload) -> Result<(), NormalizationError> {
            self.uploads.lock().unwrap().insert(upload.id().to_string(), upload.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: &UploadId) -> Result<Option<Upload>, NormalizationError> {
            Ok(self.uploads.lock().unwrap().get(&id.to_string()).cloned())
        }
        async fn list_all(&self) -> Result<Vec<Upload>, NormalizationError> {
            Ok(self.uploads.lock().unwrap().values().cloned().collect())
        }
        async fn save_constant(&self, constant: &Constant) -> Result<(), NormalizationError> {
            self.constants.lock().unwrap().push(constant.clone());
            Ok(())
        }
        async fn list_constants(&self, _upload_id: &UploadId) -> Result<Vec<Constant>, NormalizationError> {
            Ok(self.constants.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct FakeCatalogs {
        items: Mutex<Vec<CatalogItem>>,
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
            self.items.lock().unwrap().push(item.clone());
            Ok(())
        }
        async fn list_items_page(
            &self,
            _upload_id: &UploadId,
            _catalog_ids: Option<&[CatalogId]>,
            page: u32,
            limit: u32,
        ) -> Result<CatalogPage, NormalizationError> {
            let all = self.items.lock().unwrap().clone();
            let total = all.len() as u64;
            Ok(CatalogPage { items: paginate(all, page, limit), total })
        }
        async fn find_item_by_reference(&self, _catalog_id: &CatalogId, _reference: &str) -> Result<Option<CatalogItem>, NormalizationError> {
            Ok(None)
        }
        async fn find_item_by_id(&self, item_id: &normalizer_domain::CatalogItemId) -> Result<Option<CatalogItem>, NormalizationError> {
            Ok(self.items.lock().unwrap().iter().find(|i| i.id() == item_id).cloned())
        }
        async fn all_item_ids(&self, _upload_id: &UploadId) -> Result<Vec<String>, NormalizationError> {
            Ok(self.items.lock().unwrap().iter().map(|i| i.id().to_string()).collect())
        }
    }

    fn xml(s: &str) -> OpaqueXml {
        OpaqueXml::from_raw(s.to_string())
    }

    async fn seeded() -> (RetrieveCatalogUseCase, UploadId) {
        let uploads = Arc::new(FakeUploads::default());
        let catalogs = Arc::new(FakeCatalogs::default());
        let upload = Upload::handshake("erp-1.0", "default");
        uploads.save(&upload).await.unwrap();
        uploads
            .save_constant(&Constant::new(upload.id().clone(), "color", None, "enum", xml("<v/>")))
            .await
            .unwrap();
        let catalog_id = CatalogId::new();
        for i in 0..3 {
            catalogs
                .save_item(&CatalogItem::new(catalog_id.clone(), format!("ref-{i}"), None, format!("item-{i}"), xml("<a/>"), xml("<t/>")))
                .await
                .unwrap();
        }
        (RetrieveCatalogUseCase::new(uploads, catalogs), upload.id().clone())
    }

    #[tokio::test]
    async fn unknown_upload_fails() {
        let (use_case, _) = seeded().await;
        let err = use_case
            .retrieve_page(&UploadId::new(), RetrievalEntityType::All, None, 1, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizationError::UploadNotFound(_)));
    }

    #[tokio::test]
    async fn limit_is_clamped_to_ceiling() {
        let (use_case, upload_id) = seeded().await;
        let page = use_case.retrieve_page(&upload_id, RetrievalEntityType::Catalogs, None, 1, 5_000).await.unwrap();
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn all_entity_type_puts_constants_before_items() {
        let (use_case, upload_id) = seeded().await;
        let page = use_case.retrieve_page(&upload_id, RetrievalEntityType::All, None, 1, 2).await.unwrap();
        assert_eq!(page.constants.len(), 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn all_entity_type_reports_a_true_total_past_one_repository_page() {
        let uploads = Arc::new(FakeUploads::default());
        let catalogs = Arc::new(FakeCatalogs::default());
        let upload = Upload::handshake("erp-1.0", "default");
        uploads.save(&upload).await.unwrap();
        let catalog_id = CatalogId::new();
        for i in 0..(MAX_PAGE_LIMIT + 50) {
            catalogs
                .save_item(&CatalogItem::new(catalog_id.clone(), format!("ref-{i}"), None, format!("item-{i}"), xml("<a/>"), xml("<t/>")))
                .await
                .unwrap();
        }
        let use_case = RetrieveCatalogUseCase::new(uploads.clone(), catalogs);

        let page = use_case.retrieve_page(upload.id(), RetrievalEntityType::All, None, 1, 10).await.unwrap();
        assert_eq!(page.total, (MAX_PAGE_LIMIT + 50) as u64);

        let last_page_number = page.total.div_ceil(10) as u32;
        let last_page = use_case.retrieve_page(upload.id(), RetrievalEntityType::All, None, last_page_number, 10).await.unwrap();
        assert!(!last_page.items.is_empty(), "paging to the end of a >1000-item upload should still yield records");
    }

    #[tokio::test]
    async fn verify_reports_missing_ids_only() {
        let (use_case, upload_id) = seeded().await;
        let missing = use_case.verify_missing_ids(&upload_id, &["not-a-real-id".to_string()]).await.unwrap();
        assert_eq!(missing, vec!["not-a-real-id".to_string()]);
    }
}
