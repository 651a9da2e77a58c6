// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`UploadRepository`].

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use normalizer_domain::entities::constant::Constant;
use normalizer_domain::entities::upload::{Upload, UploadStatus};
use normalizer_domain::repositories::UploadRepository;
use normalizer_domain::{ConstantId, NormalizationError, OpaqueXml, UploadId};

pub struct SqliteUploadRepository {
    pool: SqlitePool,
}

impl SqliteUploadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

#[async_trait]
impl UploadRepository for SqliteUploadRepository {
    async fn save(&self, upload: &Upload) -> Result<(), NormalizationError> {
        sqlx::query(
            r#"
            INSERT INTO uploads
                (id, source_version, config_name, status, started_at, completed_at,
                 catalogs_count, constants_count, items_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                completed_at = excluded.completed_at,
                catalogs_count = excluded.catalogs_count,
                constants_count = excluded.constants_count,
                items_count = excluded.items_count
            "#,
        )
        .bind(upload.id().to_string())
        .bind(upload.source_version())
        .bind(upload.config_name())
        .bind(upload.status().as_str())
        .bind(upload.started_at().to_rfc3339())
        .bind(upload.completed_at().map(|t| t.to_rfc3339()))
        .bind(upload.catalogs_count() as i64)
        .bind(upload.constants_count() as i64)
        .bind(upload.items_count() as i64)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UploadId) -> Result<Option<Upload>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM uploads WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(row_to_upload).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Upload>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM uploads ORDER BY started_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(row_to_upload).collect()
    }

    async fn save_constant(&self, constant: &Constant) -> Result<(), NormalizationError> {
        sqlx::query(
            "INSERT INTO constants (id, upload_id, name, synonym, type, value) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET synonym = excluded.synonym, value = excluded.value",
        )
        .bind(constant.id().to_string())
        .bind(constant.upload_id().to_string())
        .bind(constant.name())
        .bind(constant.synonym())
        .bind(constant.type_name())
        .bind(constant.value().as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn list_constants(&self, upload_id: &UploadId) -> Result<Vec<Constant>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM constants WHERE upload_id = ?")
            .bind(upload_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(row_to_constant).collect()
    }
}

fn row_to_constant(row: sqlx::sqlite::SqliteRow) -> Result<Constant, NormalizationError> {
    let id = ConstantId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let upload_id = UploadId::from_string(row.try_get::<String, _>("upload_id").map_err(map_sqlx)?.as_str())?;
    let name: String = row.try_get("name").map_err(map_sqlx)?;
    let synonym: Option<String> = row.try_get("synonym").map_err(map_sqlx)?;
    let type_: String = row.try_get("type").map_err(map_sqlx)?;
    let value: String = row.try_get("value").map_err(map_sqlx)?;
    Ok(Constant::reconstitute(id, upload_id, name, synonym, type_, OpaqueXml::from_raw(value)))
}

fn row_to_upload(row: sqlx::sqlite::SqliteRow) -> Result<Upload, NormalizationError> {
    let id = UploadId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let source_version: String = row.try_get("source_version").map_err(map_sqlx)?;
    let config_name: String = row.try_get("config_name").map_err(map_sqlx)?;
    let status_str: String = row.try_get("status").map_err(map_sqlx)?;
    let status = UploadStatus::from_str(&status_str)
        .ok_or_else(|| NormalizationError::database_error(format!("unknown upload status: {status_str}")))?;
    let started_at_str: String = row.try_get("started_at").map_err(map_sqlx)?;
    let started_at = chrono::DateTime::parse_from_rfc3339(&started_at_str)
        .map_err(|e| NormalizationError::database_error(e.to_string()))?
        .with_timezone(&chrono::Utc);
    let completed_at_str: Option<String> = row.try_get("completed_at").map_err(map_sqlx)?;
    let completed_at = completed_at_str
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&chrono::Utc)))
        .transpose()
        .map_err(|e| NormalizationError::database_error(e.to_string()))?;
    let catalogs_count: i64 = row.try_get("catalogs_count").map_err(map_sqlx)?;
    let constants_count: i64 = row.try_get("constants_count").map_err(map_sqlx)?;
    let items_count: i64 = row.try_get("items_count").map_err(map_sqlx)?;

    Ok(Upload::reconstitute(
        id,
        source_version,
        config_name,
        status,
        started_at,
        completed_at,
        catalogs_count as u64,
        constants_count as u64,
        items_count as u64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::UploadRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_find_round_trips() {
        let repo = SqliteUploadRepository::new(pool().await);
        let upload = Upload::handshake("erp-1.0", "default");
        repo.save(&upload).await.unwrap();

        let found = repo.find_by_id(upload.id()).await.unwrap().unwrap();
        assert_eq!(found.id(), upload.id());
        assert_eq!(found.source_version(), "erp-1.0");
        assert_eq!(found.status(), UploadStatus::InProgress);
    }

    #[tokio::test]
    async fn list_all_orders_newest_first() {
        let repo = SqliteUploadRepository::new(pool().await);
        let first = Upload::handshake("erp-1.0", "default");
        repo.save(&first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = Upload::handshake("erp-1.1", "default");
        repo.save(&second).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.first().unwrap().id(), second.id());
    }

    #[tokio::test]
    async fn constants_are_scoped_to_upload() {
        let repo = SqliteUploadRepository::new(pool().await);
        let upload = Upload::handshake("erp-1.0", "default");
        repo.save(&upload).await.unwrap();

        let constant = Constant::new(upload.id().clone(), "МАТЕРИАЛ", None, "string", OpaqueXml::from_raw("steel"));
        repo.save_constant(&constant).await.unwrap();

        let found = repo.list_constants(upload.id()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "МАТЕРИАЛ");
    }
}
