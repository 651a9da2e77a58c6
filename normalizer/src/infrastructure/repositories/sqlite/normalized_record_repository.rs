// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`NormalizedRecordRepository`]. Per-stage state
//! lives in `record_stages`, one row per `(record_id, stage)`, written
//! only once a stage has run (no row yet means pending). `save_stage`
//! is a single-row upsert so invariant 2 (§8, atomic stage writes)
//! holds at the storage layer, not just in-process.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use normalizer_domain::entities::normalized_record::{GoldenFields, NormalizedRecord};
use normalizer_domain::repositories::NormalizedRecordRepository;
use normalizer_domain::{
    CatalogItemId, Confidence, NormalizationError, NormalizedRecordId, ProcessingMethod, Stage, StageOutcome,
};

pub struct SqliteNormalizedRecordRepository {
    pool: SqlitePool,
}

impl SqliteNormalizedRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

#[async_trait]
impl NormalizedRecordRepository for SqliteNormalizedRecordRepository {
    async fn save(&self, record: &NormalizedRecord) -> Result<(), NormalizationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let golden = record.golden();
        sqlx::query(
            r#"
            INSERT INTO normalized_records
                (id, catalog_item_id, is_valid, invalid_reason, manual_review_required,
                 ai_response_raw, final_code, final_name, final_confidence,
                 final_processing_method, final_completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                is_valid = excluded.is_valid,
                invalid_reason = excluded.invalid_reason,
                manual_review_required = excluded.manual_review_required,
                ai_response_raw = excluded.ai_response_raw,
                final_code = excluded.final_code,
                final_name = excluded.final_name,
                final_confidence = excluded.final_confidence,
                final_processing_method = excluded.final_processing_method,
                final_completed_at = excluded.final_completed_at
            "#,
        )
        .bind(record.id().to_string())
        .bind(record.catalog_item_id().to_string())
        .bind(record.is_valid())
        .bind(record.invalid_reason())
        .bind(record.manual_review_required())
        .bind(record.ai_response_raw())
        .bind(golden.map(|g| g.final_code.as_str()))
        .bind(golden.map(|g| g.final_name.as_str()))
        .bind(golden.map(|g| g.final_confidence.value()))
        .bind(golden.map(|g| g.final_processing_method.as_str()))
        .bind(golden.map(|g| g.final_completed_at.to_rfc3339()))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        for stage in Stage::ALL {
            let outcome = record.stage(stage);
            if !outcome.completed && outcome.diagnostic.is_none() {
                continue;
            }
            upsert_stage(&mut tx, record.id(), stage, outcome).await?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &NormalizedRecordId) -> Result<Option<NormalizedRecord>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM normalized_records WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_catalog_item(
        &self,
        catalog_item_id: &CatalogItemId,
    ) -> Result<Option<NormalizedRecord>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM normalized_records WHERE catalog_item_id = ?")
            .bind(catalog_item_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn save_stage(
        &self,
        record_id: &NormalizedRecordId,
        stage: Stage,
        outcome: &StageOutcome,
    ) -> Result<(), NormalizationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        upsert_stage(&mut tx, record_id, stage, outcome).await?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_without_code(&self, limit: u32) -> Result<Vec<NormalizedRecord>, NormalizationError> {
        let rows = sqlx::query(
            "SELECT * FROM normalized_records WHERE is_valid = 1 AND final_code IS NULL LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate(row).await?);
        }
        Ok(out)
    }

    async fn find_pending_stage(&self, stage: Stage, limit: u32) -> Result<Vec<NormalizedRecord>, NormalizationError> {
        let rows = sqlx::query(
            r#"
            SELECT nr.* FROM normalized_records nr
            WHERE nr.is_valid = 1
              AND NOT EXISTS (
                  SELECT 1 FROM record_stages rs
                  WHERE rs.record_id = nr.id AND rs.stage = ? AND rs.completed = 1
              )
            LIMIT ?
            "#,
        )
        .bind(stage.name())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate(row).await?);
        }
        Ok(out)
    }

    async fn count_by_processing_level(&self, level: &str) -> Result<u64, NormalizationError> {
        let methods: &[&str] = match level {
            "benchmark" => &["benchmark"],
            "ai_enhanced" => &["keyword_classifier", "hierarchical_classifier", "lm_classifier"],
            "other" => &["manual_review"],
            _ => {
                return Err(NormalizationError::ValidationError(format!(
                    "unknown processing level: {level}"
                )))
            }
        };

        let placeholders = methods.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT COUNT(*) FROM normalized_records WHERE final_processing_method IN ({placeholders})");
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for method in methods {
            query = query.bind(*method);
        }
        let count: i64 = query.fetch_one(&self.pool).await.map_err(map_sqlx)?;
        Ok(count as u64)
    }
}

impl SqliteNormalizedRecordRepository {
    async fn hydrate(&self, row: sqlx::sqlite::SqliteRow) -> Result<NormalizedRecord, NormalizationError> {
        let id = NormalizedRecordId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
        let catalog_item_id =
            CatalogItemId::from_string(row.try_get::<String, _>("catalog_item_id").map_err(map_sqlx)?.as_str())?;
        let is_valid: bool = row.try_get("is_valid").map_err(map_sqlx)?;
        let invalid_reason: Option<String> = row.try_get("invalid_reason").map_err(map_sqlx)?;
        let manual_review_required: bool = row.try_get("manual_review_required").map_err(map_sqlx)?;
        let ai_response_raw: Option<String> = row.try_get("ai_response_raw").map_err(map_sqlx)?;

        let golden = golden_from_row(&row)?;
        let stages = self.load_stages(&id).await?;

        Ok(NormalizedRecord::reconstitute(
            id,
            catalog_item_id,
            stages,
            golden,
            is_valid,
            invalid_reason,
            manual_review_required,
            ai_response_raw,
        ))
    }

    async fn load_stages(&self, record_id: &NormalizedRecordId) -> Result<HashMap<Stage, StageOutcome>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM record_stages WHERE record_id = ?")
            .bind(record_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut stages: HashMap<Stage, StageOutcome> =
            Stage::ALL.into_iter().map(|s| (s, StageOutcome::pending())).collect();

        for row in rows {
            let stage_name: String = row.try_get("stage").map_err(map_sqlx)?;
            let stage = Stage::from_name(&stage_name)
                .ok_or_else(|| NormalizationError::database_error(format!("unknown stage: {stage_name}")))?;

            let input: Option<String> = row.try_get("input").map_err(map_sqlx)?;
            let output: Option<String> = row.try_get("output").map_err(map_sqlx)?;
            let confidence: Option<f64> = row.try_get("confidence").map_err(map_sqlx)?;
            let completed: bool = row.try_get("completed").map_err(map_sqlx)?;
            let completed_at_str: Option<String> = row.try_get("completed_at").map_err(map_sqlx)?;
            let completed_at = completed_at_str
                .map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&chrono::Utc)))
                .transpose()
                .map_err(|e| NormalizationError::database_error(e.to_string()))?;
            let diagnostic: Option<String> = row.try_get("diagnostic").map_err(map_sqlx)?;

            stages.insert(
                stage,
                StageOutcome {
                    input,
                    output,
                    confidence: confidence.map(Confidence::clamped),
                    completed,
                    completed_at,
                    diagnostic,
                },
            );
        }

        Ok(stages)
    }
}

fn golden_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Option<GoldenFields>, NormalizationError> {
    let final_code: Option<String> = row.try_get("final_code").map_err(map_sqlx)?;
    let Some(final_code) = final_code else {
        return Ok(None);
    };
    let final_name: String = row.try_get("final_name").map_err(map_sqlx)?;
    let confidence_value: f64 = row.try_get("final_confidence").map_err(map_sqlx)?;
    let method_str: String = row.try_get("final_processing_method").map_err(map_sqlx)?;
    let completed_at_str: String = row.try_get("final_completed_at").map_err(map_sqlx)?;

    let final_processing_method = ProcessingMethod::from_str(&method_str)
        .ok_or_else(|| NormalizationError::database_error(format!("unknown processing method: {method_str}")))?;
    let final_completed_at = chrono::DateTime::parse_from_rfc3339(&completed_at_str)
        .map_err(|e| NormalizationError::database_error(e.to_string()))?
        .with_timezone(&chrono::Utc);

    Ok(Some(GoldenFields {
        final_code,
        final_name,
        final_confidence: Confidence::clamped(confidence_value),
        final_processing_method,
        final_completed_at,
    }))
}

async fn upsert_stage(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    record_id: &NormalizedRecordId,
    stage: Stage,
    outcome: &StageOutcome,
) -> Result<(), NormalizationError> {
    sqlx::query(
        r#"
        INSERT INTO record_stages (record_id, stage, input, output, confidence, completed, completed_at, diagnostic)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(record_id, stage) DO UPDATE SET
            input = excluded.input,
            output = excluded.output,
            confidence = excluded.confidence,
            completed = excluded.completed,
            completed_at = excluded.completed_at,
            diagnostic = excluded.diagnostic
        "#,
    )
    .bind(record_id.to_string())
    .bind(stage.name())
    .bind(&outcome.input)
    .bind(&outcome.output)
    .bind(outcome.confidence.map(|c| c.value()))
    .bind(outcome.completed)
    .bind(outcome.completed_at.map(|t| t.to_rfc3339()))
    .bind(&outcome.diagnostic)
    .execute(&mut *tx)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::NormalizedRecordRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_reload_round_trips_stage_state() {
        let repo = SqliteNormalizedRecordRepository::new(pool().await);
        let mut record = NormalizedRecord::new(CatalogItemId::new());
        record
            .complete_stage(Stage::PreCleanup, StageOutcome::complete("ok", Confidence::ONE, chrono::Utc::now()))
            .unwrap();
        repo.save(&record).await.unwrap();

        let found = repo.find_by_id(record.id()).await.unwrap().unwrap();
        assert!(found.is_stage_completed(Stage::PreCleanup));
        assert!(!found.is_stage_completed(Stage::NameNormalization));
    }

    #[tokio::test]
    async fn save_stage_is_a_single_row_upsert() {
        let repo = SqliteNormalizedRecordRepository::new(pool().await);
        let record = NormalizedRecord::new(CatalogItemId::new());
        repo.save(&record).await.unwrap();

        let outcome = StageOutcome::complete("cleaned", Confidence::new(0.9).unwrap(), chrono::Utc::now());
        repo.save_stage(record.id(), Stage::PreCleanup, &outcome).await.unwrap();

        let found = repo.find_by_id(record.id()).await.unwrap().unwrap();
        assert!(found.is_stage_completed(Stage::PreCleanup));
        assert_eq!(found.stage(Stage::PreCleanup).output.as_deref(), Some("cleaned"));
    }

    #[tokio::test]
    async fn find_pending_stage_excludes_completed_records() {
        let repo = SqliteNormalizedRecordRepository::new(pool().await);
        let mut done = NormalizedRecord::new(CatalogItemId::new());
        done.complete_stage(Stage::PreCleanup, StageOutcome::complete("ok", Confidence::ONE, chrono::Utc::now()))
            .unwrap();
        repo.save(&done).await.unwrap();

        let pending = NormalizedRecord::new(CatalogItemId::new());
        repo.save(&pending).await.unwrap();

        let found = repo.find_pending_stage(Stage::PreCleanup, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), pending.id());
    }
}
