// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema bootstrap shared by every repository implementation:
//! create the database file if missing, then apply pending migrations
//! so every service and integration test sees a consistent schema
//! (`spec.md` §3).

use sqlx::migrate::MigrateDatabase;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided SQLite pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("ensuring normalizer database schema is up to date");
    sqlx::migrate!("../migrations").run(pool).await?;
    info!("normalizer database schema is up to date");
    Ok(())
}

/// Creates the SQLite database file if it doesn't already exist.
/// `SqlitePool::connect` fails against a missing file unless the
/// connect options opt into creation, so callers that want a plain
/// URL do this up front instead.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!(database_url, "database does not exist, creating");
        sqlx::Sqlite::create_database(database_url).await?;
        info!(database_url, "created new SQLite database");
    } else {
        debug!(database_url, "database already exists");
    }
    Ok(())
}

/// Convenience entry point for application startup: create, connect,
/// migrate, return a ready-to-use pool.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_database_if_missing(database_url).await?;
    let pool = SqlitePool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn create_database_if_missing_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        create_database_if_missing(&db_url).await.unwrap();
    }

    #[tokio::test]
    async fn initialize_database_creates_expected_tables() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        let pool = initialize_database(&db_url).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='normalized_records'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(count, 1, "normalized_records table should exist after migration");
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        let pool = SqlitePool::connect(&db_url).await.unwrap();

        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
