// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `spec.md` §4.2/§6 paged and streamed retrieval, plus upload listing
//! and receipt verification.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;

use normalizer_domain::repositories::catalog_repository::RetrievalEntityType;
use normalizer_domain::{NormalizationError, UploadId};

use crate::presentation::http::dto::{DataPageResponse, RetrievalQuery, StreamQuery, VerifyRequest, VerifyResponse, UploadResponse};
use crate::presentation::http::error::ApiError;
use crate::presentation::http::state::AppState;
use crate::presentation::http::xml_render::{render_catalog_item_xml, render_constant_xml, STREAM_COMPLETE_XML};

fn parse_entity_type(raw: Option<&str>) -> Result<RetrievalEntityType, NormalizationError> {
    match raw.unwrap_or("all") {
        "all" => Ok(RetrievalEntityType::All),
        "constants" => Ok(RetrievalEntityType::Constants),
        "catalogs" | "catalog_items" => Ok(RetrievalEntityType::Catalogs),
        other => Err(NormalizationError::ValidationError(format!("unknown entity type: {other}"))),
    }
}

fn split_catalog_names(raw: &Option<String>) -> Option<Vec<String>> {
    raw.as_ref().map(|s| s.split(',').map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).collect())
}

pub async fn list_uploads(State(state): State<AppState>) -> Result<Json<Vec<UploadResponse>>, ApiError> {
    let uploads = state.retrieve.list_uploads().await?;
    Ok(Json(uploads.iter().map(UploadResponse::from).collect()))
}

pub async fn get_upload(State(state): State<AppState>, Path(upload_id): Path<String>) -> Result<Json<UploadResponse>, ApiError> {
    let upload_id = UploadId::from_string(&upload_id)?;
    let upload = state.retrieve.find_upload(&upload_id).await?;
    Ok(Json((&upload).into()))
}

pub async fn data_page(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    Query(query): Query<RetrievalQuery>,
) -> Result<Json<DataPageResponse>, ApiError> {
    let upload_id = UploadId::from_string(&upload_id)?;
    let entity_type = parse_entity_type(query.entity_type.as_deref())?;
    let catalog_names = split_catalog_names(&query.catalog_names);

    let page = state
        .retrieve
        .retrieve_page(&upload_id, entity_type, catalog_names.as_deref(), query.page, query.limit)
        .await?;
    let names = state.retrieve.catalog_name_map(&upload_id).await?;

    let mut items: Vec<String> = page.constants.iter().map(render_constant_xml).collect();
    items.extend(page.items.iter().map(|item| {
        let catalog_name = names.get(item.catalog_id()).map(String::as_str).unwrap_or_default();
        render_catalog_item_xml(item, catalog_name)
    }));

    Ok(Json(DataPageResponse {
        upload_uuid: page.upload_uuid.to_string(),
        entity_type: query.entity_type.unwrap_or_else(|| "all".to_string()),
        page: page.page,
        limit: page.limit,
        total: page.total,
        items,
    }))
}

/// `GET .../stream`: pages through the full result set via
/// [`MAX_PAGE_LIMIT`](crate::application::use_cases::MAX_PAGE_LIMIT)-sized
/// chunks and emits one SSE event per entity, followed by a terminal
/// `complete` event so the client knows when to stop reading.
pub async fn stream(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let upload_id = UploadId::from_string(&upload_id)?;
    let entity_type = parse_entity_type(query.entity_type.as_deref())?;
    let names = state.retrieve.catalog_name_map(&upload_id).await?;

    let page_size = crate::application::use_cases::MAX_PAGE_LIMIT;
    let body = stream! {
        let mut page_number = 1u32;
        loop {
            let page = match state.retrieve.retrieve_page(&upload_id, entity_type, None, page_number, page_size).await {
                Ok(page) => page,
                Err(err) => {
                    yield Ok(Event::default().event("error").data(err.to_string()));
                    break;
                }
            };

            let emitted = page.constants.len() + page.items.len();
            for constant in &page.constants {
                yield Ok(Event::default().data(render_constant_xml(constant)));
            }
            for item in &page.items {
                let catalog_name = names.get(item.catalog_id()).map(String::as_str).unwrap_or_default();
                yield Ok(Event::default().data(render_catalog_item_xml(item, catalog_name)));
            }

            if emitted == 0 || (page_number as u64) * (page_size as u64) >= page.total {
                break;
            }
            page_number += 1;
        }
        yield Ok(Event::default().data(STREAM_COMPLETE_XML));
    };

    Ok(Sse::new(body).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

pub async fn verify(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let upload_id = UploadId::from_string(&upload_id)?;
    let report = state.retrieve.verify(&upload_id, &req.received_ids).await?;
    let message = if report.is_complete {
        "all items accounted for".to_string()
    } else {
        format!("{} item(s) missing", report.missing_ids.len())
    };
    Ok(Json(VerifyResponse {
        expected_total: report.expected_total,
        received_count: report.received_count,
        missing_ids: report.missing_ids,
        is_complete: report.is_complete,
        message,
    }))
}
