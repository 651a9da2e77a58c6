// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `spec.md` §4.1/§6 staged ingestion protocol: handshake → metadata
//! (informational) → constant/catalog/item submissions → complete.

use axum::extract::State;
use axum::Json;

use normalizer_domain::{OpaqueXml, UploadId};

use crate::presentation::http::dto::{
    AckResponse, CatalogItemResponse, CatalogResponse, CompleteRequest, ConstantResponse, HandshakeRequest,
    MetadataRequest, StartCatalogRequest, SubmitConstantRequest, SubmitItemRequest, UploadResponse,
};
use crate::presentation::http::error::ApiError;
use crate::presentation::http::state::AppState;

pub async fn handshake(State(state): State<AppState>, Json(req): Json<HandshakeRequest>) -> Result<Json<UploadResponse>, ApiError> {
    let upload = state.ingest.handshake(&req.source_version, &req.config_name).await?;
    Ok(Json((&upload).into()))
}

/// No-op ack: metadata carries no normative fields for this system
/// (`spec.md` §6), so it is received and acknowledged without being
/// persisted against the upload.
pub async fn metadata(Json(_req): Json<MetadataRequest>) -> Json<AckResponse> {
    Json(AckResponse { acknowledged: true })
}

pub async fn submit_constant(
    State(state): State<AppState>,
    Json(req): Json<SubmitConstantRequest>,
) -> Result<Json<ConstantResponse>, ApiError> {
    let upload_id = UploadId::from_string(&req.upload_id)?;
    let constant = state
        .ingest
        .submit_constant(&upload_id, &req.name, req.synonym, &req.type_name, OpaqueXml::from_raw(req.value))
        .await?;
    Ok(Json((&constant).into()))
}

pub async fn start_catalog(
    State(state): State<AppState>,
    Json(req): Json<StartCatalogRequest>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let upload_id = UploadId::from_string(&req.upload_id)?;
    let catalog = state.ingest.start_catalog(&upload_id, &req.name).await?;
    Ok(Json((&catalog).into()))
}

pub async fn submit_item(
    State(state): State<AppState>,
    Json(req): Json<SubmitItemRequest>,
) -> Result<Json<CatalogItemResponse>, ApiError> {
    let upload_id = UploadId::from_string(&req.upload_id)?;
    let item = state
        .ingest
        .submit_item_by_catalog_name(
            &upload_id,
            &req.catalog_name,
            &req.reference,
            req.code,
            &req.name,
            OpaqueXml::from_raw(req.attributes),
            OpaqueXml::from_raw(req.table_parts),
        )
        .await?;
    Ok(Json((&item).into()))
}

pub async fn complete(State(state): State<AppState>, Json(req): Json<CompleteRequest>) -> Result<Json<UploadResponse>, ApiError> {
    let upload_id = UploadId::from_string(&req.upload_id)?;
    let upload = state.ingest.complete(&upload_id).await?;
    Ok(Json((&upload).into()))
}
