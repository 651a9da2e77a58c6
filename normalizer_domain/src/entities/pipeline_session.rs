// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A run identifier linking a batch of normalized records to a project,
//! used for provenance and resumability (`spec.md` §3, §6
//! `POST /api/normalization/start`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Queued,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Queued => "queued",
            SessionPhase::Running => "running",
            SessionPhase::Completed => "completed",
            SessionPhase::Cancelled => "cancelled",
            SessionPhase::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(SessionPhase::Queued),
            "running" => Some(SessionPhase::Running),
            "completed" => Some(SessionPhase::Completed),
            "cancelled" => Some(SessionPhase::Cancelled),
            "failed" => Some(SessionPhase::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSession {
    id: SessionId,
    project_id: String,
    client_id: String,
    use_kpved: bool,
    phase: SessionPhase,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    processed_count: u64,
    total_count: u64,
}

impl PipelineSession {
    pub fn start(project_id: impl Into<String>, client_id: impl Into<String>, use_kpved: bool, total_count: u64) -> Self {
        Self {
            id: SessionId::new(),
            project_id: project_id.into(),
            client_id: client_id.into(),
            use_kpved,
            phase: SessionPhase::Queued,
            started_at: Utc::now(),
            finished_at: None,
            processed_count: 0,
            total_count,
        }
    }

    /// Rebuilds a session from already-persisted state, preserving its
    /// original id, phase, and counters.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        project_id: String,
        client_id: String,
        use_kpved: bool,
        phase: SessionPhase,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
        processed_count: u64,
        total_count: u64,
    ) -> Self {
        Self { id, project_id, client_id, use_kpved, phase, started_at, finished_at, processed_count, total_count }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn use_kpved(&self) -> bool {
        self.use_kpved
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn mark_running(&mut self) {
        if self.phase == SessionPhase::Queued {
            self.phase = SessionPhase::Running;
        }
    }

    pub fn advance(&mut self, by: u64) {
        self.processed_count = (self.processed_count + by).min(self.total_count);
    }

    fn finish(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.finished_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.finish(SessionPhase::Completed);
    }

    pub fn cancel(&mut self) {
        self.finish(SessionPhase::Cancelled);
    }

    pub fn fail(&mut self) {
        self.finish(SessionPhase::Failed);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, SessionPhase::Completed | SessionPhase::Cancelled | SessionPhase::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_never_exceeds_total() {
        let mut session = PipelineSession::start("proj", "client", true, 10);
        session.mark_running();
        session.advance(15);
        assert_eq!(session.processed_count(), 10);
    }

    #[test]
    fn terminal_phases_set_finished_at() {
        let mut session = PipelineSession::start("proj", "client", false, 1);
        assert!(session.finished_at().is_none());
        session.complete();
        assert!(session.is_terminal());
        assert!(session.finished_at().is_some());
    }
}
