// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Request/response bodies for `spec.md` §6's wire contract. Ids cross
//! the wire as plain strings; `attributes`/`table_parts`/constant
//! `value` cross as raw XML fragments, never parsed here (`spec.md`
//! §9 opaque-XML design note).

use serde::{Deserialize, Serialize};

use normalizer_domain::{Catalog, CatalogItem, Constant, Group, PipelineSession, Upload};

// ---------------------------------------------------------------------------
// Ingestion: POST /handshake, /metadata, /constant, /catalog/meta,
// /catalog/item, /complete
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HandshakeRequest {
    pub source_version: String,
    pub config_name: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub upload_id: String,
    pub status: String,
    pub source_version: String,
    pub config_name: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub catalogs_count: u64,
    pub constants_count: u64,
    pub items_count: u64,
}

impl From<&Upload> for UploadResponse {
    fn from(upload: &Upload) -> Self {
        Self {
            upload_id: upload.id().to_string(),
            status: upload.status().as_str().to_string(),
            source_version: upload.source_version().to_string(),
            config_name: upload.config_name().to_string(),
            started_at: upload.started_at().to_rfc3339(),
            completed_at: upload.completed_at().map(|t| t.to_rfc3339()),
            catalogs_count: upload.catalogs_count(),
            constants_count: upload.constants_count(),
            items_count: upload.items_count(),
        }
    }
}

/// `POST /metadata` is informational only (`spec.md` §6): the body is
/// accepted and acknowledged, nothing is persisted against it.
#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    pub upload_id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub acknowledged: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitConstantRequest {
    pub upload_id: String,
    pub name: String,
    pub synonym: Option<String>,
    pub type_name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ConstantResponse {
    pub id: String,
}

impl From<&Constant> for ConstantResponse {
    fn from(constant: &Constant) -> Self {
        Self { id: constant.id().to_string() }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartCatalogRequest {
    pub upload_id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub id: String,
    pub name: String,
}

impl From<&Catalog> for CatalogResponse {
    fn from(catalog: &Catalog) -> Self {
        Self { id: catalog.id().to_string(), name: catalog.name().to_string() }
    }
}

/// `catalog_name` resolves to a catalog within the upload (`spec.md`
/// §6: "`/catalog/item` references catalog by name").
#[derive(Debug, Deserialize)]
pub struct SubmitItemRequest {
    pub upload_id: String,
    pub catalog_name: String,
    pub reference: String,
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub table_parts: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogItemResponse {
    pub id: String,
}

impl From<&CatalogItem> for CatalogItemResponse {
    fn from(item: &CatalogItem) -> Self {
        Self { id: item.id().to_string() }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub upload_id: String,
}

// ---------------------------------------------------------------------------
// Retrieval: GET /api/uploads[/{uuid}], .../data, .../stream, POST .../verify
// ---------------------------------------------------------------------------

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct RetrievalQuery {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub catalog_names: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct DataPageResponse {
    pub upload_uuid: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub received_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub expected_total: u64,
    pub received_count: u64,
    pub missing_ids: Vec<String>,
    pub is_complete: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Normalization: POST /api/normalization/start, GET .../status,
// POST /api/kpved/reclassify-hierarchical, GET .../current-tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StartNormalizationRequest {
    pub project_id: String,
    pub client_id: String,
    #[serde(default)]
    pub use_kpved: bool,
    pub upload_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub project_id: String,
    pub client_id: String,
    pub use_kpved: bool,
    pub phase: String,
    pub processed_count: u64,
    pub total_count: u64,
    pub started_at: String,
    pub finished_at: Option<String>,
}

impl From<&PipelineSession> for SessionResponse {
    fn from(session: &PipelineSession) -> Self {
        Self {
            session_id: session.id().to_string(),
            project_id: session.project_id().to_string(),
            client_id: session.client_id().to_string(),
            use_kpved: session.use_kpved(),
            phase: session.phase().as_str().to_string(),
            processed_count: session.processed_count(),
            total_count: session.total_count(),
            started_at: session.started_at().to_rfc3339(),
            finished_at: session.finished_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReclassifyRequest {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ReclassifyResponse {
    pub attempted: u64,
    pub reclassified: u64,
    pub left_pending: u64,
}

// ---------------------------------------------------------------------------
// Duplicate detection: POST /api/duplicates/detect
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DetectDuplicatesRequest {
    pub item_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub group_key: String,
    pub merged_count: u32,
    pub master_item_id: Option<String>,
    pub member_ids: Vec<String>,
}

impl From<&Group> for GroupResponse {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id().to_string(),
            group_key: group.group_key().to_string(),
            merged_count: group.merged_count(),
            master_item_id: group.master_item_id().map(|id| id.to_string()),
            member_ids: group.member_ids().map(|id| id.to_string()).collect(),
        }
    }
}
