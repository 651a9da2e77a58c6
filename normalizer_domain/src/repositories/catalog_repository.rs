// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for catalogs and their items, including the
//! paged/streamed retrieval surface (`spec.md` §4.2).

use async_trait::async_trait;

use crate::entities::catalog::Catalog;
use crate::entities::catalog_item::CatalogItem;
use crate::{CatalogId, NormalizationError, UploadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalEntityType {
    All,
    Constants,
    Catalogs,
}

/// A single page of the concatenated constants+catalog-items virtual
/// list (`spec.md` §4.2: "constants precede catalog items; both
/// subsequences preserve id order").
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub total: u64,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn save_catalog(&self, catalog: &Catalog) -> Result<(), NormalizationError>;

    async fn find_catalog_by_name(&self, upload_id: &UploadId, name: &str) -> Result<Option<Catalog>, NormalizationError>;

    async fn list_catalogs(&self, upload_id: &UploadId) -> Result<Vec<Catalog>, NormalizationError>;

    async fn save_item(&self, item: &CatalogItem) -> Result<(), NormalizationError>;

    /// Insertion-ordered page over catalog items, honoring the
    /// optional catalog-name allow-list and a hard page-size ceiling
    /// enforced by the caller (`spec.md` §4.2: ceiling of 1000).
    async fn list_items_page(
        &self,
        upload_id: &UploadId,
        catalog_ids: Option<&[CatalogId]>,
        page: u32,
        limit: u32,
    ) -> Result<CatalogPage, NormalizationError>;

    async fn find_item_by_reference(
        &self,
        catalog_id: &CatalogId,
        reference: &str,
    ) -> Result<Option<CatalogItem>, NormalizationError>;

    /// Used by duplicate detection (`spec.md` §4.5) to resolve a
    /// [`crate::CatalogItemId`] named by a [`NormalizedRecord`] back to
    /// its source code/name pair.
    async fn find_item_by_id(&self, item_id: &crate::CatalogItemId) -> Result<Option<CatalogItem>, NormalizationError>;

    /// Used by the verification endpoint (`spec.md` §6 `POST
    /// /api/uploads/{uuid}/verify`) to diff a client-asserted id set
    /// against what is actually persisted.
    async fn all_item_ids(&self, upload_id: &UploadId) -> Result<Vec<String>, NormalizationError>;
}
