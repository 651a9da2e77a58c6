// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload
//!
//! One ingestion session from the source ERP system (`spec.md` §3, §4.1).
//! An upload is mutated additively by the staged ingestion protocol
//! (handshake → metadata → constants/catalogs/items → complete) and
//! becomes terminal once `complete()` is called.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NormalizationError, UploadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    InProgress,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::InProgress => "in_progress",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(UploadStatus::InProgress),
            "completed" => Some(UploadStatus::Completed),
            "failed" => Some(UploadStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    id: UploadId,
    source_version: String,
    config_name: String,
    status: UploadStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    catalogs_count: u64,
    constants_count: u64,
    items_count: u64,
}

impl Upload {
    /// Allocates a new, in-progress upload. This is the handshake step of
    /// `spec.md` §4.1.
    pub fn handshake(source_version: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            id: UploadId::new(),
            source_version: source_version.into(),
            config_name: config_name.into(),
            status: UploadStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            catalogs_count: 0,
            constants_count: 0,
            items_count: 0,
        }
    }

    /// Rebuilds an upload from already-persisted state, preserving its
    /// original id/status/counters/timestamps. Repository
    /// implementations use this instead of [`Upload::handshake`] so
    /// reloading a row doesn't reset it to a fresh in-progress state.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: UploadId,
        source_version: String,
        config_name: String,
        status: UploadStatus,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        catalogs_count: u64,
        constants_count: u64,
        items_count: u64,
    ) -> Self {
        Self { id, source_version, config_name, status, started_at, completed_at, catalogs_count, constants_count, items_count }
    }

    pub fn id(&self) -> &UploadId {
        &self.id
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn is_finalized(&self) -> bool {
        !matches!(self.status, UploadStatus::InProgress)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn source_version(&self) -> &str {
        &self.source_version
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn catalogs_count(&self) -> u64 {
        self.catalogs_count
    }

    pub fn constants_count(&self) -> u64 {
        self.constants_count
    }

    pub fn items_count(&self) -> u64 {
        self.items_count
    }

    /// Guards every counter-advancing mutation: submissions against a
    /// finalized upload are rejected (`spec.md` §4.1 guarantee (b)).
    fn ensure_in_progress(&self) -> Result<(), NormalizationError> {
        if self.is_finalized() {
            return Err(NormalizationError::UploadFinalized(self.id.to_string()));
        }
        Ok(())
    }

    pub fn record_catalog(&mut self) -> Result<(), NormalizationError> {
        self.ensure_in_progress()?;
        self.catalogs_count += 1;
        Ok(())
    }

    pub fn record_constant(&mut self) -> Result<(), NormalizationError> {
        self.ensure_in_progress()?;
        self.constants_count += 1;
        Ok(())
    }

    pub fn record_item(&mut self) -> Result<(), NormalizationError> {
        self.ensure_in_progress()?;
        self.items_count += 1;
        Ok(())
    }

    /// Terminal transition. Counters are frozen from this point on.
    pub fn complete(&mut self) -> Result<(), NormalizationError> {
        self.ensure_in_progress()?;
        self.status = UploadStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, _reason: impl Into<String>) {
        self.status = UploadStatus::Failed;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_advance_only_while_in_progress() {
        let mut upload = Upload::handshake("erp-1.0", "default");
        upload.record_catalog().unwrap();
        upload.record_item().unwrap();
        upload.complete().unwrap();

        assert_eq!(upload.catalogs_count(), 1);
        assert_eq!(upload.items_count(), 1);
        assert!(matches!(upload.record_item(), Err(NormalizationError::UploadFinalized(_))));
    }

    #[test]
    fn complete_is_idempotent_failure_not_crash() {
        let mut upload = Upload::handshake("erp-1.0", "default");
        upload.complete().unwrap();
        assert!(upload.complete().is_err());
    }
}
