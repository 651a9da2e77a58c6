// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Integration tests for schema initialization against real SQLite
//! databases (`spec.md` §3).

use normalizer::infrastructure::repositories::sqlite::schema;
use tempfile::NamedTempFile;

#[tokio::test]
async fn initializes_an_in_memory_database() {
    let pool = schema::initialize_database("sqlite::memory:").await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='normalized_records'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "normalized_records table should exist after migration");
}

#[tokio::test]
async fn creates_and_migrates_a_file_backed_database() {
    let temp = NamedTempFile::new().unwrap();
    let db_path = temp.path().to_str().unwrap().to_string();
    drop(temp);

    let pool = schema::initialize_database(&format!("sqlite://{db_path}")).await.unwrap();

    let migrations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations").fetch_one(&pool).await.unwrap();
    assert!(migrations > 0, "at least one migration should be recorded");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn initialization_is_idempotent() {
    let temp = NamedTempFile::new().unwrap();
    let db_path = temp.path().to_str().unwrap().to_string();
    drop(temp);
    let db_url = format!("sqlite://{db_path}");

    schema::initialize_database(&db_url).await.unwrap();
    schema::initialize_database(&db_url).await.unwrap();

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn every_spec_table_exists_after_migration() {
    let pool = schema::initialize_database("sqlite::memory:").await.unwrap();

    for table in [
        "uploads",
        "constants",
        "catalogs",
        "catalog_items",
        "normalized_records",
        "record_stages",
        "groups",
        "group_members",
        "code_tree_nodes",
        "benchmarks",
        "benchmark_variations",
        "pipeline_sessions",
    ] {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1, "table `{table}` should exist after migration");
    }
}
