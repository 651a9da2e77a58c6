// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Normalization Use Case
//!
//! Wires a [`PipelineSession`] lifecycle around [`NormalizationPipeline::run_batch`]
//! for `spec.md` §6's `POST /api/normalization/start`, `GET
//! .../status`, and `GET .../current-tasks`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use normalizer_domain::repositories::SessionRepository;
use normalizer_domain::{CatalogItemId, NormalizationError, PipelineSession, SessionId};

use crate::infrastructure::runtime::normalization_pipeline::{NormalizationPipeline, PipelineRunSummary};

pub struct RunNormalizationUseCase {
    sessions: Arc<dyn SessionRepository>,
    pipeline: Arc<NormalizationPipeline>,
}

impl RunNormalizationUseCase {
    pub fn new(sessions: Arc<dyn SessionRepository>, pipeline: Arc<NormalizationPipeline>) -> Self {
        Self { sessions, pipeline }
    }

    /// Starts a session and runs the pipeline over `item_ids` to
    /// completion. Callers that want a fire-and-forget start/status
    /// split should spawn this on a task and poll `status` by session
    /// id; this method itself runs synchronously to its conclusion.
    #[instrument(skip(self, item_ids), fields(item_count = item_ids.len()))]
    pub async fn start(
        &self,
        project_id: &str,
        client_id: &str,
        use_kpved: bool,
        item_ids: Vec<CatalogItemId>,
        cancel: CancellationToken,
    ) -> Result<(PipelineSession, PipelineRunSummary), NormalizationError> {
        let mut session = PipelineSession::start(project_id, client_id, use_kpved, item_ids.len() as u64);
        self.sessions.save(&session).await?;

        session.mark_running();
        self.sessions.save(&session).await?;
        info!(session_id = %session.id(), "normalization session started");

        let result = self.pipeline.run_batch(&item_ids, cancel.clone()).await;

        match result {
            Ok(summary) => {
                session.advance(summary.processed);
                if cancel.is_cancelled() {
                    session.cancel();
                } else {
                    session.complete();
                }
                self.sessions.save(&session).await?;
                info!(session_id = %session.id(), processed = summary.processed, "normalization session finished");
                Ok((session, summary))
            }
            Err(err) => {
                error!(session_id = %session.id(), %err, "normalization session failed");
                session.fail();
                self.sessions.save(&session).await?;
                Err(err)
            }
        }
    }

    /// `GET /api/normalization/status`: current phase/counters for one session.
    pub async fn status(&self, session_id: &SessionId) -> Result<PipelineSession, NormalizationError> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| NormalizationError::RecordNotFound(session_id.to_string()))
    }

    /// `GET /api/kpved/current-tasks`: every non-terminal session.
    pub async fn current_tasks(&self) -> Result<Vec<PipelineSession>, NormalizationError> {
        self.sessions.list_active().await
    }
}
