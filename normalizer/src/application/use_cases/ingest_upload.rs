// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingest Upload Use Case
//!
//! Orchestrates the staged ingestion protocol (`spec.md` §4.1):
//! handshake → constant/catalog/item submissions → complete. Every
//! submission against a completed or unknown upload fails with
//! `UploadNotFound`/`UploadFinalized`; per-item failures are reported
//! to the caller without advancing the upload's counters.

use std::sync::Arc;

use tracing::{info, instrument};

use normalizer_domain::repositories::{CatalogRepository, UploadRepository};
use normalizer_domain::{Catalog, CatalogId, CatalogItem, Constant, NormalizationError, OpaqueXml, Upload, UploadId};

pub struct IngestUploadUseCase {
    uploads: Arc<dyn UploadRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl IngestUploadUseCase {
    pub fn new(uploads: Arc<dyn UploadRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { uploads, catalog }
    }

    /// Stage 1: allocates a new in-progress upload.
    #[instrument(skip(self))]
    pub async fn handshake(&self, source_version: &str, config_name: &str) -> Result<Upload, NormalizationError> {
        let upload = Upload::handshake(source_version, config_name);
        self.uploads.save(&upload).await?;
        info!(upload_id = %upload.id(), "upload handshake");
        Ok(upload)
    }

    /// Stage 3: attaches a name/synonym/type/value constant to an
    /// in-progress upload. `value` is stored exactly as received
    /// (`spec.md` §4.1 guarantee (c)).
    pub async fn submit_constant(
        &self,
        upload_id: &UploadId,
        name: &str,
        synonym: Option<String>,
        type_name: &str,
        value: OpaqueXml,
    ) -> Result<Constant, NormalizationError> {
        let mut upload = self.fetch_in_progress(upload_id).await?;
        upload.record_constant()?;

        let constant = Constant::new(upload_id.clone(), name, synonym, type_name, value);
        self.uploads.save_constant(&constant).await?;
        self.uploads.save(&upload).await?;
        Ok(constant)
    }

    /// Stage 4: declares a catalog under the upload, returning its id
    /// for subsequent item submissions.
    pub async fn start_catalog(&self, upload_id: &UploadId, name: &str) -> Result<Catalog, NormalizationError> {
        let mut upload = self.fetch_in_progress(upload_id).await?;
        upload.record_catalog()?;

        let catalog = Catalog::new(upload_id.clone(), name);
        self.catalog.save_catalog(&catalog).await?;
        self.uploads.save(&upload).await?;
        Ok(catalog)
    }

    /// Stage 5: submits one catalog item. `attributes`/`table_parts`
    /// XML payloads are preserved verbatim. Item submissions are
    /// accepted in arrival order and the persisted id ordering
    /// reflects that order (`spec.md` §4.1 guarantee (d), since
    /// `CatalogItemId` is a time-ordered ULID).
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_item(
        &self,
        upload_id: &UploadId,
        catalog_id: &CatalogId,
        reference: &str,
        code: Option<String>,
        name: &str,
        attributes: OpaqueXml,
        table_parts: OpaqueXml,
    ) -> Result<CatalogItem, NormalizationError> {
        let mut upload = self.fetch_in_progress(upload_id).await?;
        upload.record_item()?;

        let item = CatalogItem::new(catalog_id.clone(), reference, code, name, attributes, table_parts);
        self.catalog.save_item(&item).await?;
        self.uploads.save(&upload).await?;
        Ok(item)
    }

    /// Stage 5 variant for callers that only have the catalog's name
    /// (`spec.md` §6 `POST /catalog/item` "references catalog by
    /// name"), resolving it against this upload's catalogs first.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_item_by_catalog_name(
        &self,
        upload_id: &UploadId,
        catalog_name: &str,
        reference: &str,
        code: Option<String>,
        name: &str,
        attributes: OpaqueXml,
        table_parts: OpaqueXml,
    ) -> Result<CatalogItem, NormalizationError> {
        let catalog = self
            .catalog
            .find_catalog_by_name(upload_id, catalog_name)
            .await?
            .ok_or_else(|| NormalizationError::CatalogNotFound(catalog_name.to_string()))?;
        self.submit_item(upload_id, catalog.id(), reference, code, name, attributes, table_parts).await
    }

    /// Stage 6: terminal transition. Counters are frozen from this
    /// point on.
    #[instrument(skip(self))]
    pub async fn complete(&self, upload_id: &UploadId) -> Result<Upload, NormalizationError> {
        let mut upload = self.fetch_in_progress(upload_id).await?;
        upload.complete()?;
        self.uploads.save(&upload).await?;
        info!(
            upload_id = %upload.id(),
            catalogs = upload.catalogs_count(),
            items = upload.items_count(),
            "upload completed"
        );
        Ok(upload)
    }

    async fn fetch_in_progress(&self, upload_id: &UploadId) -> Result<Upload, NormalizationError> {
        let upload = self.uploads.find_by_id(upload_id).await?.ok_or_else(|| NormalizationError::UploadNotFound(upload_id.to_string()))?;
        if upload.is_finalized() {
            return Err(NormalizationError::UploadFinalized(upload_id.to_string()));
        }
        Ok(upload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use normalizer_domain::repositories::catalog_repository::CatalogPage;

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
        catalogs: Mutex<Vec<Catalog>>,
        items: Mutex<Vec<CatalogItem>>,
    }

    #[async_trait]
    impl CatalogRepository for FakeCatalogs {
        async fn save_catalog(&self, catalog: &Catalog) -> Result<(), NormalizationError> {
            self.catalogs.lock().unwrap().push(catalog.clone());
            Ok(())
        }
        async fn find_catalog_by_name(&self, _upload_id: &UploadId, _name: &str) -> Result<Option<Catalog>, NormalizationError> {
            Ok(None)
        }
        async fn list_catalogs(&self, _upload_id: &UploadId) -> Result<Vec<Catalog>, NormalizationError> {
            Ok(self.catalogs.lock().unwrap().clone())
        }
        async fn save_item(&self, item: &CatalogItem) -> Result<(), NormalizationError> {
            self.items.lock().unwrap().push(item.clone());
            Ok(())
        }
        async fn list_items_page(
            &self,
            _upload_id: &UploadId,
            _catalog_ids: Option<&[CatalogId]>,
            _page: u32,
            _limit: u32,
        ) -> Result<CatalogPage, NormalizationError> {
            Ok(CatalogPage { items: self.items.lock().unwrap().clone(), total: self.items.lock().unwrap().len() as u64 })
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

    fn use_case() -> IngestUploadUseCase {
        IngestUploadUseCase::new(Arc::new(FakeUploads::default()), Arc::new(FakeCatalogs::default()))
    }

    #[tokio::test]
    async fn submitting_against_unknown_upload_fails() {
        let use_case = use_case();
        let err = use_case.start_catalog(&UploadId::new(), "cat").await.unwrap_err();
        assert!(matches!(err, NormalizationError::UploadNotFound(_)));
    }

    #[tokio::test]
    async fn submitting_after_complete_fails() {
        let use_case = use_case();
        let upload = use_case.handshake("erp-1.0", "default").await.unwrap();
        use_case.complete(upload.id()).await.unwrap();

        let err = use_case.start_catalog(upload.id(), "cat").await.unwrap_err();
        assert!(matches!(err, NormalizationError::UploadFinalized(_)));
    }

    #[tokio::test]
    async fn full_staged_protocol_advances_counters() {
        let use_case = use_case();
        let upload = use_case.handshake("erp-1.0", "default").await.unwrap();

        use_case
            .submit_constant(upload.id(), "color", None, "enum", OpaqueXml::from_raw("<v>blue</v>"))
            .await
            .unwrap();
        let catalog = use_case.start_catalog(upload.id(), "electronics").await.unwrap();
        use_case
            .submit_item(
                upload.id(),
                catalog.id(),
                "ref-1",
                None,
                "widget",
                OpaqueXml::from_raw("<a/>"),
                OpaqueXml::from_raw("<t/>"),
            )
            .await
            .unwrap();

        let completed = use_case.complete(upload.id()).await.unwrap();
        assert_eq!(completed.constants_count(), 1);
        assert_eq!(completed.catalogs_count(), 1);
        assert_eq!(completed.items_count(), 1);
        assert!(completed.is_finalized());
    }
}
