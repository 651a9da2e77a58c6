// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`BenchmarkRepository`]. `find_best_match` tries
//! the canonical-name lookup first, then falls through to the
//! variations side table (`spec.md` §4.8).

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use normalizer_domain::entities::benchmark::Benchmark;
use normalizer_domain::repositories::BenchmarkRepository;
use normalizer_domain::{BenchmarkId, NormalizationError};

pub struct SqliteBenchmarkRepository {
    pool: SqlitePool,
}

impl SqliteBenchmarkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn variations_for(&self, id: &BenchmarkId) -> Result<Vec<String>, NormalizationError> {
        let rows = sqlx::query("SELECT variation FROM benchmark_variations WHERE benchmark_id = ?")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(|row| row.try_get::<String, _>("variation").map_err(map_sqlx)).collect()
    }

    async fn hydrate(&self, row: sqlx::sqlite::SqliteRow) -> Result<Benchmark, NormalizationError> {
        let id = BenchmarkId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
        let entity_type: String = row.try_get("entity_type").map_err(map_sqlx)?;
        let canonical_name: String = row.try_get("canonical_name").map_err(map_sqlx)?;
        let data_blob: String = row.try_get("data_blob").map_err(map_sqlx)?;
        let is_active: bool = row.try_get("is_active").map_err(map_sqlx)?;
        let variations = self.variations_for(&id).await?;

        Ok(Benchmark::reconstitute(id, entity_type, canonical_name, data_blob, is_active, variations))
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

#[async_trait]
impl BenchmarkRepository for SqliteBenchmarkRepository {
    async fn save(&self, benchmark: &Benchmark) -> Result<(), NormalizationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO benchmarks (id, entity_type, canonical_name, data_blob, is_active)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data_blob = excluded.data_blob,
                is_active = excluded.is_active
            "#,
        )
        .bind(benchmark.id().to_string())
        .bind(benchmark.entity_type())
        .bind(benchmark.canonical_name())
        .bind(benchmark.data_blob())
        .bind(benchmark.is_active())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("DELETE FROM benchmark_variations WHERE benchmark_id = ?")
            .bind(benchmark.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        for variation in benchmark.variations() {
            sqlx::query("INSERT INTO benchmark_variations (benchmark_id, variation) VALUES (?, ?)")
                .bind(benchmark.id().to_string())
                .bind(variation)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_best_match(&self, entity_type: &str, name: &str) -> Result<Option<Benchmark>, NormalizationError> {
        let lowered = name.to_lowercase();

        let row = sqlx::query(
            "SELECT * FROM benchmarks WHERE entity_type = ? AND LOWER(canonical_name) = ? AND is_active = 1",
        )
        .bind(entity_type)
        .bind(&lowered)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if let Some(row) = row {
            return Ok(Some(self.hydrate(row).await?));
        }

        let row = sqlx::query(
            r#"
            SELECT b.* FROM benchmarks b
            JOIN benchmark_variations v ON v.benchmark_id = b.id
            WHERE b.entity_type = ? AND LOWER(v.variation) = ? AND b.is_active = 1
            "#,
        )
        .bind(entity_type)
        .bind(&lowered)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: &BenchmarkId) -> Result<Option<Benchmark>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM benchmarks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self, entity_type: &str) -> Result<Vec<Benchmark>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM benchmarks WHERE entity_type = ? AND is_active = 1")
            .bind(entity_type)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate(row).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::BenchmarkRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn finds_by_canonical_name_case_insensitively() {
        let repo = SqliteBenchmarkRepository::new(pool().await);
        let benchmark = Benchmark::new("catalog_item", "Кабель ВВГ", "{}");
        repo.save(&benchmark).await.unwrap();

        let found = repo.find_best_match("catalog_item", "кабель ввг").await.unwrap().unwrap();
        assert_eq!(found.id(), benchmark.id());
    }

    #[tokio::test]
    async fn finds_by_variation_when_canonical_does_not_match() {
        let repo = SqliteBenchmarkRepository::new(pool().await);
        let mut benchmark = Benchmark::new("catalog_item", "Кабель ВВГ", "{}");
        benchmark.add_variation("кабель ввг-нг");
        repo.save(&benchmark).await.unwrap();

        let found = repo.find_best_match("catalog_item", "Кабель ВВГ-НГ").await.unwrap().unwrap();
        assert_eq!(found.id(), benchmark.id());
    }

    #[tokio::test]
    async fn inactive_benchmarks_are_excluded_from_list_active() {
        let repo = SqliteBenchmarkRepository::new(pool().await);
        let mut benchmark = Benchmark::new("catalog_item", "name", "{}");
        benchmark.deactivate();
        repo.save(&benchmark).await.unwrap();

        assert!(repo.list_active("catalog_item").await.unwrap().is_empty());
    }
}
