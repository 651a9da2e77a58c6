// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`GroupRepository`]. `merge` runs read-union-
//! write-delete inside one transaction so concurrent merges of the
//! same group pair can't interleave (`spec.md` §5).

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use normalizer_domain::entities::group::Group;
use normalizer_domain::repositories::GroupRepository;
use normalizer_domain::{GroupId, NormalizationError, NormalizedRecordId};

pub struct SqliteGroupRepository {
    pool: SqlitePool,
}

impl SqliteGroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

async fn save_tx(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, group: &Group) -> Result<(), NormalizationError> {
    sqlx::query(
        r#"
        INSERT INTO groups (id, group_key, refined_group_id, merged_count, master_item_id)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            refined_group_id = excluded.refined_group_id,
            merged_count = excluded.merged_count,
            master_item_id = excluded.master_item_id
        "#,
    )
    .bind(group.id().to_string())
    .bind(group.group_key())
    .bind(group.refined_group_id().map(|id| id.to_string()))
    .bind(group.merged_count() as i64)
    .bind(group.master_item_id().map(|id| id.to_string()))
    .execute(&mut *tx)
    .await
    .map_err(map_sqlx)?;

    sqlx::query("DELETE FROM group_members WHERE group_id = ?")
        .bind(group.id().to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

    for member in group.member_ids() {
        sqlx::query("INSERT INTO group_members (group_id, record_id) VALUES (?, ?)")
            .bind(group.id().to_string())
            .bind(member.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
    }

    Ok(())
}

#[async_trait]
impl GroupRepository for SqliteGroupRepository {
    async fn save(&self, group: &Group) -> Result<(), NormalizationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        save_tx(&mut tx, group).await?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &GroupId) -> Result<Option<Group>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM groups WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_member(&self, item_id: &NormalizedRecordId) -> Result<Option<Group>, NormalizationError> {
        let row = sqlx::query(
            "SELECT g.* FROM groups g JOIN group_members gm ON gm.group_id = g.id WHERE gm.record_id = ?",
        )
        .bind(item_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_by_priority(&self, limit: u32) -> Result<Vec<Group>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM groups ORDER BY merged_count DESC LIMIT ?")
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

    async fn merge(&self, into: &GroupId, from: &GroupId) -> Result<Group, NormalizationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let into_row = sqlx::query("SELECT * FROM groups WHERE id = ?")
            .bind(into.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .ok_or_else(|| NormalizationError::RecordNotFound(format!("group {into} not found")))?;
        let from_row = sqlx::query("SELECT * FROM groups WHERE id = ?")
            .bind(from.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .ok_or_else(|| NormalizationError::RecordNotFound(format!("group {from} not found")))?;

        let mut into_group = hydrate_row(&mut tx, into_row).await?;
        let from_group = hydrate_row(&mut tx, from_row).await?;

        into_group.merge(&from_group);
        save_tx(&mut tx, &into_group).await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = ?")
            .bind(from.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(from.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(into_group)
    }
}

impl SqliteGroupRepository {
    async fn hydrate(&self, row: sqlx::sqlite::SqliteRow) -> Result<Group, NormalizationError> {
        let member_rows = sqlx::query("SELECT record_id FROM group_members WHERE group_id = ?")
            .bind(row.try_get::<String, _>("id").map_err(map_sqlx)?)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row_to_group(row, member_rows)
    }
}

/// Same hydration logic as [`SqliteGroupRepository::hydrate`], but
/// usable mid-transaction where `&self.pool` would race the open
/// transaction's row locks.
async fn hydrate_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    row: sqlx::sqlite::SqliteRow,
) -> Result<Group, NormalizationError> {
    let id: String = row.try_get("id").map_err(map_sqlx)?;
    let member_rows = sqlx::query("SELECT record_id FROM group_members WHERE group_id = ?")
        .bind(&id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx)?;

    row_to_group(row, member_rows)
}

fn row_to_group(row: sqlx::sqlite::SqliteRow, member_rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Group, NormalizationError> {
    let id = GroupId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let group_key: String = row.try_get("group_key").map_err(map_sqlx)?;
    let refined_group_id: Option<String> = row.try_get("refined_group_id").map_err(map_sqlx)?;
    let refined_group_id = refined_group_id.map(|s| GroupId::from_string(&s)).transpose()?;
    let merged_count: i64 = row.try_get("merged_count").map_err(map_sqlx)?;
    let master_item_id: Option<String> = row.try_get("master_item_id").map_err(map_sqlx)?;
    let master_item_id = master_item_id.map(|s| NormalizedRecordId::from_string(&s)).transpose()?;

    let member_ids: HashSet<NormalizedRecordId> = member_rows
        .into_iter()
        .map(|r| -> Result<NormalizedRecordId, NormalizationError> {
            NormalizedRecordId::from_string(r.try_get::<String, _>("record_id").map_err(map_sqlx)?.as_str())
        })
        .collect::<Result<_, _>>()?;

    Ok(Group::reconstitute(id, group_key, refined_group_id, merged_count as u32, master_item_id, member_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::GroupRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_find_round_trips_members() {
        let repo = SqliteGroupRepository::new(pool().await);
        let member = NormalizedRecordId::new();
        let group = Group::new("key", [member.clone()]);
        repo.save(&group).await.unwrap();

        let found = repo.find_by_member(&member).await.unwrap().unwrap();
        assert_eq!(found.id(), group.id());
        assert!(found.contains(&member));
    }

    #[tokio::test]
    async fn merge_unions_members_and_deletes_source() {
        let repo = SqliteGroupRepository::new(pool().await);
        let a_member = NormalizedRecordId::new();
        let b_member = NormalizedRecordId::new();
        let into = Group::new("key", [a_member.clone()]);
        let from = Group::new("key", [b_member.clone()]);
        repo.save(&into).await.unwrap();
        repo.save(&from).await.unwrap();

        let merged = repo.merge(into.id(), from.id()).await.unwrap();
        assert_eq!(merged.size(), 2);
        assert!(repo.find_by_id(from.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_by_priority_orders_by_merged_count_desc() {
        let repo = SqliteGroupRepository::new(pool().await);
        let small = Group::new("a", [NormalizedRecordId::new()]);
        repo.save(&small).await.unwrap();

        let a_member = NormalizedRecordId::new();
        let b_member = NormalizedRecordId::new();
        let mut big = Group::new("b", [a_member]);
        let other = Group::new("b", [b_member]);
        big.merge(&other);
        repo.save(&big).await.unwrap();

        let ordered = repo.list_by_priority(10).await.unwrap();
        assert_eq!(ordered[0].id(), big.id());
    }
}
