// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! An item belongs to one catalog. `reference` is the source-system
//! unique key; `(catalog_id, reference)` is unique within a completed
//! upload (`spec.md` §3). `attributes`/`table_parts` are preserved
//! verbatim — see [`crate::OpaqueXml`].

use serde::{Deserialize, Serialize};

use crate::{CatalogId, CatalogItemId, OpaqueXml};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    id: CatalogItemId,
    catalog_id: CatalogId,
    reference: String,
    code: Option<String>,
    name: String,
    attributes: OpaqueXml,
    table_parts: OpaqueXml,
}

impl CatalogItem {
    pub fn new(
        catalog_id: CatalogId,
        reference: impl Into<String>,
        code: Option<String>,
        name: impl Into<String>,
        attributes: OpaqueXml,
        table_parts: OpaqueXml,
    ) -> Self {
        Self {
            id: CatalogItemId::new(),
            catalog_id,
            reference: reference.into(),
            code,
            name: name.into(),
            attributes,
            table_parts,
        }
    }

    /// Rebuilds an item from already-validated persisted state,
    /// preserving its original id (see [`Catalog::reconstitute`] for
    /// why repositories use this rather than [`CatalogItem::new`]).
    ///
    /// [`Catalog::reconstitute`]: crate::entities::catalog::Catalog::reconstitute
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: CatalogItemId,
        catalog_id: CatalogId,
        reference: String,
        code: Option<String>,
        name: String,
        attributes: OpaqueXml,
        table_parts: OpaqueXml,
    ) -> Self {
        Self { id, catalog_id, reference, code, name, attributes, table_parts }
    }

    pub fn id(&self) -> &CatalogItemId {
        &self.id
    }

    pub fn catalog_id(&self) -> &CatalogId {
        &self.catalog_id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &OpaqueXml {
        &self.attributes
    }

    pub fn table_parts(&self) -> &OpaqueXml {
        &self.table_parts
    }
}
