// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`SessionRepository`]. `list_active` backs `GET
//! /api/normalization/current-tasks` (`spec.md` §6): any session whose
//! phase has not reached a terminal state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use normalizer_domain::entities::pipeline_session::{PipelineSession, SessionPhase};
use normalizer_domain::repositories::SessionRepository;
use normalizer_domain::{NormalizationError, SessionId};

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NormalizationError::database_error(format!("bad timestamp `{raw}`: {e}")))
}

fn row_to_session(row: sqlx::sqlite::SqliteRow) -> Result<PipelineSession, NormalizationError> {
    let id = SessionId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let project_id: String = row.try_get("project_id").map_err(map_sqlx)?;
    let client_id: String = row.try_get("client_id").map_err(map_sqlx)?;
    let use_kpved: bool = row.try_get("use_kpved").map_err(map_sqlx)?;
    let phase_str: String = row.try_get("phase").map_err(map_sqlx)?;
    let phase = SessionPhase::from_str(&phase_str)
        .ok_or_else(|| NormalizationError::database_error(format!("unknown session phase: {phase_str}")))?;
    let started_at: String = row.try_get("started_at").map_err(map_sqlx)?;
    let started_at = parse_timestamp(&started_at)?;
    let finished_at: Option<String> = row.try_get("finished_at").map_err(map_sqlx)?;
    let finished_at = finished_at.map(|raw| parse_timestamp(&raw)).transpose()?;
    let processed_count: i64 = row.try_get("processed_count").map_err(map_sqlx)?;
    let total_count: i64 = row.try_get("total_count").map_err(map_sqlx)?;

    Ok(PipelineSession::reconstitute(
        id,
        project_id,
        client_id,
        use_kpved,
        phase,
        started_at,
        finished_at,
        processed_count as u64,
        total_count as u64,
    ))
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn save(&self, session: &PipelineSession) -> Result<(), NormalizationError> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_sessions
                (id, project_id, client_id, use_kpved, phase, total_count, processed_count, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                phase = excluded.phase,
                processed_count = excluded.processed_count,
                finished_at = excluded.finished_at
            "#,
        )
        .bind(session.id().to_string())
        .bind(session.project_id())
        .bind(session.client_id())
        .bind(session.use_kpved())
        .bind(session.phase().as_str())
        .bind(session.total_count() as i64)
        .bind(session.processed_count() as i64)
        .bind(session.started_at().to_rfc3339())
        .bind(session.finished_at().map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<PipelineSession>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM pipeline_sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(row_to_session).transpose()
    }

    async fn list_active(&self) -> Result<Vec<PipelineSession>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM pipeline_sessions WHERE phase NOT IN ('completed', 'cancelled', 'failed')")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(row_to_session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::SessionRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_find_round_trips_counters_and_phase() {
        let repo = SqliteSessionRepository::new(pool().await);
        let mut session = PipelineSession::start("proj-1", "client-1", true, 100);
        session.mark_running();
        session.advance(40);
        repo.save(&session).await.unwrap();

        let found = repo.find_by_id(session.id()).await.unwrap().unwrap();
        assert_eq!(found.phase(), SessionPhase::Running);
        assert_eq!(found.processed_count(), 40);
        assert_eq!(found.total_count(), 100);
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_sessions() {
        let repo = SqliteSessionRepository::new(pool().await);

        let running = PipelineSession::start("proj", "client", false, 10);
        repo.save(&running).await.unwrap();

        let mut done = PipelineSession::start("proj", "client", false, 10);
        done.complete();
        repo.save(&done).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), running.id());
    }
}
