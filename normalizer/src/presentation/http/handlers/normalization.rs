// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `spec.md` §4.3/§4.4/§6: kicks off a normalization pass over an
//! upload's items, reports session status, and drives the
//! hierarchical-reclassification sweep.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::Json;

use normalizer_domain::{CatalogItemId, SessionId, UploadId};

use crate::presentation::http::dto::{
    ReclassifyRequest, ReclassifyResponse, SessionResponse, StartNormalizationRequest, StatusQuery,
};
use crate::presentation::http::error::ApiError;
use crate::presentation::http::state::AppState;

/// `spec.md` §6 `POST /api/normalization/start`: resolves every item
/// belonging to `upload_id` and runs the pipeline over them to
/// completion before responding, so the returned session is already in
/// its terminal phase.
pub async fn start(State(state): State<AppState>, Json(req): Json<StartNormalizationRequest>) -> Result<Json<SessionResponse>, ApiError> {
    let upload_id = UploadId::from_string(&req.upload_id)?;
    let raw_ids = state.retrieve.all_item_ids(&upload_id).await?;
    let item_ids = raw_ids
        .iter()
        .map(|id| CatalogItemId::from_str(id))
        .collect::<Result<Vec<_>, _>>()?;

    let cancel = tokio_util::sync::CancellationToken::new();
    let (session, _summary) = state
        .run_normalization
        .start(&req.project_id, &req.client_id, req.use_kpved, item_ids, cancel)
        .await?;
    Ok(Json((&session).into()))
}

pub async fn status(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = SessionId::from_string(&query.session_id)?;
    let session = state.run_normalization.status(&session_id).await?;
    Ok(Json((&session).into()))
}

pub async fn current_tasks(State(state): State<AppState>) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state.run_normalization.current_tasks().await?;
    Ok(Json(sessions.iter().map(SessionResponse::from).collect()))
}

pub async fn reclassify_hierarchical(
    State(state): State<AppState>,
    Json(req): Json<ReclassifyRequest>,
) -> Result<Json<ReclassifyResponse>, ApiError> {
    let limit = req.limit.unwrap_or(100);
    let summary = state.reclassify.execute(limit, state.default_reclassify_min_confidence).await?;
    Ok(Json(ReclassifyResponse {
        attempted: summary.attempted,
        reclassified: summary.reclassified,
        left_pending: summary.left_pending,
    }))
}
