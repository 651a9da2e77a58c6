// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single, flat error enum for the normalization domain. Each variant is
//! categorized so callers can decide retry/fallback behavior without
//! matching on strings (see `§7 Error Handling Design` in the spec).

use thiserror::Error;

/// Domain-specific errors for the catalog normalization system.
#[derive(Error, Debug, Clone)]
pub enum NormalizationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("upload not found: {0}")]
    UploadNotFound(String),

    #[error("upload already finalized: {0}")]
    UploadFinalized(String),

    #[error("catalog not found: {0}")]
    CatalogNotFound(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("state violation: {0}")]
    StateViolation(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("xml error: {0}")]
    XmlError(String),

    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("LM invalid choice: {0}")]
    LmInvalidChoice(String),

    #[error("LM malformed output: {0}")]
    LmMalformedOutput(String),

    #[error("circuit open: {0}")]
    CircuitOpen(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("unidentified schema: {0}")]
    UnidentifiedSchema(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl NormalizationError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Transient failures the caller may retry (storage locks, LM timeouts).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NormalizationError::Timeout(_) | NormalizationError::DatabaseError(_) | NormalizationError::RateLimited(_)
        )
    }

    /// Coarse category, used for metrics labels and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            NormalizationError::InvalidConfiguration(_) => "configuration",
            NormalizationError::ValidationError(_) => "validation",
            NormalizationError::UploadNotFound(_) => "not_found",
            NormalizationError::UploadFinalized(_) => "state",
            NormalizationError::CatalogNotFound(_) => "not_found",
            NormalizationError::RecordNotFound(_) => "not_found",
            NormalizationError::StateViolation(_) => "state",
            NormalizationError::DatabaseError(_) => "database",
            NormalizationError::SerializationError(_) => "serialization",
            NormalizationError::XmlError(_) => "xml",
            NormalizationError::ClassifierUnavailable(_) => "classifier",
            NormalizationError::LmInvalidChoice(_) => "classifier",
            NormalizationError::LmMalformedOutput(_) => "classifier",
            NormalizationError::CircuitOpen(_) => "lm_client",
            NormalizationError::RateLimited(_) => "lm_client",
            NormalizationError::Timeout(_) => "lm_client",
            NormalizationError::Cancelled(_) => "cancellation",
            NormalizationError::UnidentifiedSchema(_) => "detector",
            NormalizationError::InternalError(_) => "internal",
        }
    }
}

impl From<std::io::Error> for NormalizationError {
    fn from(err: std::io::Error) -> Self {
        NormalizationError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for NormalizationError {
    fn from(err: serde_json::Error) -> Self {
        NormalizationError::SerializationError(err.to_string())
    }
}
