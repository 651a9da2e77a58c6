// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! sqlx/SQLite-backed [`CatalogRepository`]. `list_items_page` paginates
//! the insertion-ordered sequence of catalog items for one upload,
//! honoring the optional catalog-name allow-list (`spec.md` §4.2).

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use normalizer_domain::entities::catalog::Catalog;
use normalizer_domain::entities::catalog_item::CatalogItem;
use normalizer_domain::repositories::catalog_repository::CatalogPage;
use normalizer_domain::repositories::CatalogRepository;
use normalizer_domain::{CatalogId, CatalogItemId, NormalizationError, OpaqueXml, UploadId};

pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> NormalizationError {
    NormalizationError::database_error(err.to_string())
}

fn row_to_catalog(row: sqlx::sqlite::SqliteRow) -> Result<Catalog, NormalizationError> {
    let id = CatalogId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let upload_id = UploadId::from_string(row.try_get::<String, _>("upload_id").map_err(map_sqlx)?.as_str())?;
    let name: String = row.try_get("name").map_err(map_sqlx)?;
    Ok(Catalog::reconstitute(id, upload_id, name))
}

fn row_to_item(row: sqlx::sqlite::SqliteRow) -> Result<CatalogItem, NormalizationError> {
    let id = CatalogItemId::from_string(row.try_get::<String, _>("id").map_err(map_sqlx)?.as_str())?;
    let catalog_id = CatalogId::from_string(row.try_get::<String, _>("catalog_id").map_err(map_sqlx)?.as_str())?;
    let reference: String = row.try_get("reference").map_err(map_sqlx)?;
    let code: Option<String> = row.try_get("code").map_err(map_sqlx)?;
    let name: String = row.try_get("name").map_err(map_sqlx)?;
    let attributes: String = row.try_get("attributes").map_err(map_sqlx)?;
    let table_parts: String = row.try_get("table_parts").map_err(map_sqlx)?;

    Ok(CatalogItem::reconstitute(
        id,
        catalog_id,
        reference,
        code,
        name,
        OpaqueXml::from_raw(attributes),
        OpaqueXml::from_raw(table_parts),
    ))
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn save_catalog(&self, catalog: &Catalog) -> Result<(), NormalizationError> {
        sqlx::query(
            "INSERT INTO catalogs (id, upload_id, name) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(catalog.id().to_string())
        .bind(catalog.upload_id().to_string())
        .bind(catalog.name())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_catalog_by_name(&self, upload_id: &UploadId, name: &str) -> Result<Option<Catalog>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM catalogs WHERE upload_id = ? AND name = ?")
            .bind(upload_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(row_to_catalog).transpose()
    }

    async fn list_catalogs(&self, upload_id: &UploadId) -> Result<Vec<Catalog>, NormalizationError> {
        let rows = sqlx::query("SELECT * FROM catalogs WHERE upload_id = ?")
            .bind(upload_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(row_to_catalog).collect()
    }

    async fn save_item(&self, item: &CatalogItem) -> Result<(), NormalizationError> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (id, catalog_id, reference, code, name, attributes, table_parts)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(catalog_id, reference) DO UPDATE SET
                code = excluded.code,
                name = excluded.name,
                attributes = excluded.attributes,
                table_parts = excluded.table_parts
            "#,
        )
        .bind(item.id().to_string())
        .bind(item.catalog_id().to_string())
        .bind(item.reference())
        .bind(item.code())
        .bind(item.name())
        .bind(item.attributes().as_str())
        .bind(item.table_parts().as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn list_items_page(
        &self,
        upload_id: &UploadId,
        catalog_ids: Option<&[CatalogId]>,
        page: u32,
        limit: u32,
    ) -> Result<CatalogPage, NormalizationError> {
        let offset = (page as i64) * (limit as i64);

        let catalog_id_strings: Vec<String> = catalog_ids
            .map(|ids| ids.iter().map(|id| id.to_string()).collect())
            .unwrap_or_default();

        let (items, total) = if catalog_id_strings.is_empty() {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM catalog_items ci JOIN catalogs c ON c.id = ci.catalog_id WHERE c.upload_id = ?",
            )
            .bind(upload_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;

            let rows = sqlx::query(
                r#"
                SELECT ci.* FROM catalog_items ci
                JOIN catalogs c ON c.id = ci.catalog_id
                WHERE c.upload_id = ?
                ORDER BY ci.inserted_at ASC, ci.id ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(upload_id.to_string())
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

            (rows, total)
        } else {
            let placeholders = catalog_id_strings.iter().map(|_| "?").collect::<Vec<_>>().join(", ");

            let count_sql = format!(
                "SELECT COUNT(*) FROM catalog_items ci JOIN catalogs c ON c.id = ci.catalog_id \
                 WHERE c.upload_id = ? AND ci.catalog_id IN ({placeholders})"
            );
            let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(upload_id.to_string());
            for id in &catalog_id_strings {
                count_query = count_query.bind(id);
            }
            let total = count_query.fetch_one(&self.pool).await.map_err(map_sqlx)?;

            let page_sql = format!(
                "SELECT ci.* FROM catalog_items ci JOIN catalogs c ON c.id = ci.catalog_id \
                 WHERE c.upload_id = ? AND ci.catalog_id IN ({placeholders}) \
                 ORDER BY ci.inserted_at ASC, ci.id ASC LIMIT ? OFFSET ?"
            );
            let mut page_query = sqlx::query(&page_sql).bind(upload_id.to_string());
            for id in &catalog_id_strings {
                page_query = page_query.bind(id);
            }
            let rows = page_query.bind(limit as i64).bind(offset).fetch_all(&self.pool).await.map_err(map_sqlx)?;

            (rows, total)
        };

        let items = items.into_iter().map(row_to_item).collect::<Result<Vec<_>, _>>()?;
        Ok(CatalogPage { items, total: total as u64 })
    }

    async fn find_item_by_reference(
        &self,
        catalog_id: &CatalogId,
        reference: &str,
    ) -> Result<Option<CatalogItem>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM catalog_items WHERE catalog_id = ? AND reference = ?")
            .bind(catalog_id.to_string())
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(row_to_item).transpose()
    }

    async fn find_item_by_id(&self, item_id: &CatalogItemId) -> Result<Option<CatalogItem>, NormalizationError> {
        let row = sqlx::query("SELECT * FROM catalog_items WHERE id = ?")
            .bind(item_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(row_to_item).transpose()
    }

    async fn all_item_ids(&self, upload_id: &UploadId) -> Result<Vec<String>, NormalizationError> {
        let rows = sqlx::query(
            "SELECT ci.id FROM catalog_items ci JOIN catalogs c ON c.id = ci.catalog_id WHERE c.upload_id = ?",
        )
        .bind(upload_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(|row| row.try_get::<String, _>("id").map_err(map_sqlx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer_domain::repositories::CatalogRepository as _;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::sqlite::schema::ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_find_item_by_reference() {
        let repo = SqliteCatalogRepository::new(pool().await);
        let catalog = Catalog::new(UploadId::new(), "Материалы");
        repo.save_catalog(&catalog).await.unwrap();

        let item = CatalogItem::new(
            catalog.id().clone(),
            "REF-1",
            Some("01.02.03".to_string()),
            "кабель ввг",
            OpaqueXml::from_raw(""),
            OpaqueXml::from_raw(""),
        );
        repo.save_item(&item).await.unwrap();

        let found = repo.find_item_by_reference(catalog.id(), "REF-1").await.unwrap().unwrap();
        assert_eq!(found.id(), item.id());
        assert_eq!(found.code(), Some("01.02.03"));
    }

    #[tokio::test]
    async fn find_item_by_id_resolves_code_and_name() {
        let repo = SqliteCatalogRepository::new(pool().await);
        let catalog = Catalog::new(UploadId::new(), "Материалы");
        repo.save_catalog(&catalog).await.unwrap();

        let item = CatalogItem::new(
            catalog.id().clone(),
            "REF-2",
            None,
            "труба стальная",
            OpaqueXml::from_raw(""),
            OpaqueXml::from_raw(""),
        );
        repo.save_item(&item).await.unwrap();

        let found = repo.find_item_by_id(item.id()).await.unwrap().unwrap();
        assert_eq!(found.name(), "труба стальная");
    }

    #[tokio::test]
    async fn list_items_page_honors_catalog_allow_list() {
        let repo = SqliteCatalogRepository::new(pool().await);
        let upload_id = UploadId::new();
        let catalog_a = Catalog::new(upload_id.clone(), "A");
        let catalog_b = Catalog::new(upload_id.clone(), "B");
        repo.save_catalog(&catalog_a).await.unwrap();
        repo.save_catalog(&catalog_b).await.unwrap();

        repo.save_item(&CatalogItem::new(
            catalog_a.id().clone(),
            "a-1",
            None,
            "item a",
            OpaqueXml::from_raw(""),
            OpaqueXml::from_raw(""),
        ))
        .await
        .unwrap();
        repo.save_item(&CatalogItem::new(
            catalog_b.id().clone(),
            "b-1",
            None,
            "item b",
            OpaqueXml::from_raw(""),
            OpaqueXml::from_raw(""),
        ))
        .await
        .unwrap();

        let page = repo.list_items_page(&upload_id, Some(&[catalog_a.id().clone()]), 0, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name(), "item a");
    }
}
