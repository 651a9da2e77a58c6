// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`CodeTreeRepository`]. `list_all` is ordered by
//! `code` so the classifier's tree builder sees a stable, repeatable
//! shape (`spec.md` §4.6).

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use normalizer_domain::entities::code_tree_node::CodeTreeNode;
use normalizer_domain::repositories::CodeTreeRepository;
use normalizer_domain::{CodeLevel, CodeNodeId, NormalizationError};

pub struct SqliteCodeTreeRepository {
    pool: SqlitePool,
}

impl SqliteCodeTreeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

fn row_to_node(row: sqlx::sqlite::SqliteRow) -> Result<CodeTreeNode, NormalizationError> {
    let id = CodeNodeId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let code: String = row.try_get("code").map_err(map_sqlx)?;
    let name: String = row.try_get("name").map_err(map_sqlx)?;
    let parent_code: Option<String> = row.try_get("parent_code").map_err(map_sqlx)?;
    let level_str: String = row.try_get("level").map_err(map_sqlx)?;
    let level = CodeLevel::from_str(&level_str)
        .ok_or_else(|| NormalizationError::database_error(format!("unknown code level: {level_str}")))?;

    Ok(CodeTreeNode::reconstitute(id, code, name, parent_code, level))
}

#[async_trait]
impl CodeTreeRepository for SqliteCodeTreeRepository {
    async fn list_all(&self) -> Result<Vec<CodeTreeNode>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM code_tree_nodes ORDER BY code ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(row_to_node).collect()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<CodeTreeNode>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM code_tree_nodes WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(row_to_node).transpose()
    }

    async fn save(&self, node: &CodeTreeNode) -> Result<(), NormalizationError> {
        sqlx::query(
            r#"
            INSERT INTO code_tree_nodes (id, code, name, parent_code, level)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET name = excluded.name, parent_code = excluded.parent_code, level = excluded.level
            "#,
        )
        .bind(node.id().to_string())
        .bind(node.code())
        .bind(node.name())
        .bind(node.parent_code())
        .bind(node.level().as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::CodeTreeRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_find_by_code() {
        let repo = SqliteCodeTreeRepository::new(pool().await);
        let node = CodeTreeNode::new("01", "Раздел", None, CodeLevel::Section);
        repo.save(&node).await.unwrap();

        let found = repo.find_by_code("01").await.unwrap().unwrap();
        assert_eq!(found.name(), "Раздел");
        assert_eq!(found.level(), CodeLevel::Section);
    }

    #[tokio::test]
    async fn list_all_is_ordered_by_code() {
        let repo = SqliteCodeTreeRepository::new(pool().await);
        repo.save(&CodeTreeNode::new("02", "b", None, CodeLevel::Section)).await.unwrap();
        repo.save(&CodeTreeNode::new("01", "a", None, CodeLevel::Section)).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all[0].code(), "01");
        assert_eq!(all[1].code(), "02");
    }
}
