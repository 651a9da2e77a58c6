// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Maps [`NormalizationError`] onto `spec.md` §6's `{error, timestamp}`
//! envelope. Status codes are kept to the set the spec names for this
//! surface — 400/404/500, plus axum's own 405 for a path matched with
//! the wrong method — so [`NormalizationError::category`] collapses
//! onto just those three buckets.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use normalizer_domain::NormalizationError;

pub struct ApiError(NormalizationError);

impl From<NormalizationError> for ApiError {
    fn from(err: NormalizationError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation" | "configuration" | "state" | "xml" | "serialization" | "detector" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody { error: self.0.to_string(), timestamp: Utc::now().to_rfc3339() };
        (status, Json(body)).into_response()
    }
}
