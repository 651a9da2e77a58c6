// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `spec.md` §4.5/§6's generic "query/filter endpoints ... quality
//! groups" clause: runs duplicate detection over an explicit item-id
//! set and returns the committed groups.

use std::str::FromStr;

use axum::extract::State;
use axum::Json;

use normalizer_domain::NormalizedRecordId;

use crate::presentation::http::dto::{DetectDuplicatesRequest, GroupResponse};
use crate::presentation::http::error::ApiError;
use crate::presentation::http::state::AppState;

pub async fn detect(
    State(state): State<AppState>,
    Json(req): Json<DetectDuplicatesRequest>,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let item_ids = req
        .item_ids
        .iter()
        .map(|id| NormalizedRecordId::from_str(id))
        .collect::<Result<Vec<_>, _>>()?;

    let groups = state.detect_duplicates.execute(&item_ids, &state.default_duplicate_config).await?;
    Ok(Json(groups.iter().map(GroupResponse::from).collect()))
}
