// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command DTOs carried from the presentation layer into the
//! application layer's use cases. These are transport-agnostic: the
//! HTTP layer maps its request bodies onto these, nothing here knows
//! about axum or JSON.

use normalizer_domain::{CatalogId, NormalizedRecordId, OpaqueXml, SessionId, UploadId};

/// `POST /handshake`.
#[derive(Debug, Clone)]
pub struct HandshakeCommand {
    pub source_version: String,
    pub config_name: String,
}

/// `POST /constant`.
#[derive(Debug, Clone)]
pub struct SubmitConstantCommand {
    pub upload_id: UploadId,
    pub name: String,
    pub synonym: Option<String>,
    pub type_name: String,
    pub value: OpaqueXml,
}

/// `POST /catalog/meta`.
#[derive(Debug, Clone)]
pub struct StartCatalogCommand {
    pub upload_id: UploadId,
    pub name: String,
}

/// `POST /catalog/item`.
#[derive(Debug, Clone)]
pub struct SubmitItemCommand {
    pub upload_id: UploadId,
    pub catalog_id: CatalogId,
    pub reference: String,
    pub code: Option<String>,
    pub name: String,
    pub attributes: OpaqueXml,
    pub table_parts: OpaqueXml,
}

/// `POST /complete`.
#[derive(Debug, Clone)]
pub struct CompleteUploadCommand {
    pub upload_id: UploadId,
}

/// `POST /api/normalization/start`.
#[derive(Debug, Clone)]
pub struct StartNormalizationCommand {
    pub project_id: String,
    pub client_id: String,
    pub use_kpved: bool,
    pub upload_id: UploadId,
}

/// `GET /api/normalization/status`.
#[derive(Debug, Clone)]
pub struct NormalizationStatusQuery {
    pub session_id: SessionId,
}

/// `POST /api/kpved/reclassify-hierarchical`.
#[derive(Debug, Clone)]
pub struct ReclassifyCommand {
    pub limit: u32,
    pub min_confidence: f64,
}

/// `POST /api/uploads/{uuid}/verify`.
#[derive(Debug, Clone)]
pub struct VerifyUploadCommand {
    pub upload_id: UploadId,
    pub asserted_ids: Vec<String>,
}

/// Target of a duplicate-detection pass, prepared by the caller from
/// an upload's normalized records (`spec.md` §4.5).
#[derive(Debug, Clone)]
pub struct DetectDuplicatesCommand {
    pub item_ids: Vec<NormalizedRecordId>,
}
