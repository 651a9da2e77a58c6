// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for [`Upload`] and its owned constants
//! (`spec.md` §4.1). Catalogs and items are owned by [`Upload`] but
//! have their own higher-volume repository (see
//! [`crate::repositories::CatalogRepository`]).

use async_trait::async_trait;

use crate::entities::constant::Constant;
use crate::entities::upload::Upload;
use crate::{NormalizationError, UploadId};

#[async_trait]
pub trait UploadRepository: Send + Sync {
    async fn save(&self, upload: &Upload) -> Result<(), NormalizationError>;

    async fn find_by_id(&self, id: &UploadId) -> Result<Option<Upload>, NormalizationError>;

    /// Newest first, per `spec.md` §6 `GET /api/uploads`.
    async fn list_all(&self) -> Result<Vec<Upload>, NormalizationError>;

    async fn save_constant(&self, constant: &Constant) -> Result<(), NormalizationError>;

    async fn list_constants(&self, upload_id: &UploadId) -> Result<Vec<Constant>, NormalizationError>;
}
