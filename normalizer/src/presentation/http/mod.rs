// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The HTTP surface from `spec.md` §6, built once by
//! `normalizer_bootstrap`'s composition root and served with
//! `axum::serve`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;
pub mod xml_render;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Assembles the full route table. Every handler is stateless except
/// for the shared [`AppState`], so the router itself can be cloned and
/// served from multiple listeners if ever needed.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/handshake", post(handlers::ingestion::handshake))
        .route("/metadata", post(handlers::ingestion::metadata))
        .route("/constant", post(handlers::ingestion::submit_constant))
        .route("/catalog/meta", post(handlers::ingestion::start_catalog))
        .route("/catalog/item", post(handlers::ingestion::submit_item))
        .route("/complete", post(handlers::ingestion::complete))
        .route("/api/uploads", get(handlers::retrieval::list_uploads))
        .route("/api/uploads/:upload_id", get(handlers::retrieval::get_upload))
        .route("/api/uploads/:upload_id/data", get(handlers::retrieval::data_page))
        .route("/api/uploads/:upload_id/stream", get(handlers::retrieval::stream))
        .route("/api/uploads/:upload_id/verify", post(handlers::retrieval::verify))
        .route("/api/normalization/start", post(handlers::normalization::start))
        .route("/api/normalization/status", get(handlers::normalization::status))
        .route("/api/kpved/reclassify-hierarchical", post(handlers::normalization::reclassify_hierarchical))
        .route("/api/kpved/current-tasks", get(handlers::normalization::current_tasks))
        .route("/api/duplicates/detect", post(handlers::duplicates::detect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
