// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for [`PipelineSession`] (`spec.md` §6 `POST
//! /api/normalization/start`, `GET .../status`, `GET .../current-tasks`).

use async_trait::async_trait;

use crate::entities::pipeline_session::PipelineSession;
use crate::{NormalizationError, SessionId};

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save(&self, session: &PipelineSession) -> Result<(), NormalizationError>;

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<PipelineSession>, NormalizationError>;

    /// Non-terminal sessions, for `GET /api/normalization/current-tasks`.
    async fn list_active(&self) -> Result<Vec<PipelineSession>, NormalizationError>;
}
