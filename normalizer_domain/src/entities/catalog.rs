// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A catalog belongs to exactly one upload (`spec.md` §3). Owned
//! CASCADE-style: removing the upload removes its catalogs.

use serde::{Deserialize, Serialize};

use crate::{CatalogId, UploadId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    id: CatalogId,
    upload_id: UploadId,
    name: String,
}

impl Catalog {
    pub fn new(upload_id: UploadId, name: impl Into<String>) -> Self {
        Self { id: CatalogId::new(), upload_id, name: name.into() }
    }

    /// Rebuilds a catalog from already-validated persisted state,
    /// preserving its original id. Repository implementations use this
    /// instead of [`Catalog::new`] so reloading a row doesn't mint a
    /// fresh id.
    pub fn reconstitute(id: CatalogId, upload_id: UploadId, name: String) -> Self {
        Self { id, upload_id, name }
    }

    pub fn id(&self) -> &CatalogId {
        &self.id
    }

    pub fn upload_id(&self) -> &UploadId {
        &self.upload_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
