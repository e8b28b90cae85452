//! # Category Repository
//!
//! Persists the catalog aggregate: one `categories` row per category holding
//! the whole subcategory/item/batch tree as a JSON document.
//!
//! ## Item Index
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  categories                          catalog_items                      │
//! │  ┌──────────────────────────┐        ┌───────────────────────────────┐  │
//! │  │ id  store  name  document│───────▶│ item_id → category_id,        │  │
//! │  │ c1  S1     Bev   {...}   │        │           subcategory_id      │  │
//! │  └──────────────────────────┘        │ UNIQUE(store_id, sku_key)     │  │
//! │                                      │ UNIQUE(store_id, barcode)     │  │
//! │                                      └───────────────────────────────┘  │
//! │                                                                         │
//! │  Every save rewrites the document AND the category's index rows in     │
//! │  one transaction, so an item id or SKU resolves to its category        │
//! │  without scanning every document.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockroom_core::catalog::{ItemView, StockStatus};
use stockroom_core::{Category, CoreError, CoreResult, PageRequest};

/// Filters for the category listing.
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for the flat item listing.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Substring of name, SKU or barcode (case-insensitive).
    pub search: Option<String>,
    pub stock_status: Option<StockStatus>,
    pub category_id: Option<String>,
    /// Only low-stock and out-of-stock items.
    pub low_stock_only: bool,
}

impl ItemFilter {
    fn matches(&self, view: &ItemView) -> bool {
        if let Some(search) = self.search.as_deref().map(str::to_lowercase) {
            let item = &view.item;
            let hit = item.name.to_lowercase().contains(&search)
                || item.sku.to_lowercase().contains(&search)
                || item
                    .barcode
                    .as_deref()
                    .is_some_and(|b| b.to_lowercase().contains(&search));
            if !hit {
                return false;
            }
        }
        if self.stock_status.is_some_and(|s| s != view.stock_status) {
            return false;
        }
        if self
            .category_id
            .as_deref()
            .is_some_and(|c| c != view.category_id)
        {
            return false;
        }
        if self.low_stock_only
            && !matches!(
                view.stock_status,
                StockStatus::LowStock | StockStatus::OutOfStock
            )
        {
            return false;
        }
        true
    }
}

/// Repository for the catalog aggregate.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a new category. Names are unique per store (case-insensitive).
    pub async fn create(&self, category: &mut Category) -> DbResult<()> {
        debug!(store_id = %category.store_id, name = %category.name, "Creating category");

        let mut tx = self.pool.begin().await?;
        write_category(&mut *tx, category).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Gets a category of the given store.
    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<Category> {
        let mut conn = self.pool.acquire().await?;
        load_category(&mut *conn, store_id, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()).into())
    }

    /// Lists categories of a store ordered by name.
    pub async fn list(
        &self,
        store_id: &str,
        filter: &CategoryFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<Category>, u64)> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM categories
            WHERE store_id = ?1
              AND (?2 IS NULL OR name LIKE '%' || ?2 || '%')
              AND (?3 IS NULL OR is_active = ?3)
            "#,
        )
        .bind(store_id)
        .bind(search)
        .bind(filter.is_active)
        .fetch_one(&self.pool)
        .await?;

        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document FROM categories
            WHERE store_id = ?1
              AND (?2 IS NULL OR name LIKE '%' || ?2 || '%')
              AND (?3 IS NULL OR is_active = ?3)
            ORDER BY name_key
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(store_id)
        .bind(search)
        .bind(filter.is_active)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let categories = documents
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<Result<Vec<Category>, _>>()?;

        Ok((categories, total as u64))
    }

    /// Every category of a store, for cross-category reads.
    pub async fn all(&self, store_id: &str) -> DbResult<Vec<Category>> {
        let documents: Vec<String> = sqlx::query_scalar(
            "SELECT document FROM categories WHERE store_id = ?1 ORDER BY name_key",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .collect()
    }

    /// Loads a category, applies `change` and saves the result.
    ///
    /// Nothing is written when `change` fails.
    pub async fn modify<T, F>(
        &self,
        store_id: &str,
        id: &str,
        updated_by: Option<&str>,
        change: F,
    ) -> DbResult<(Category, T)>
    where
        F: FnOnce(&mut Category) -> CoreResult<T>,
    {
        let mut tx = self.pool.begin().await?;

        let mut category = load_category(&mut *tx, store_id, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        let output = change(&mut category)?;
        category.touch(updated_by);
        write_category(&mut *tx, &mut category).await?;

        tx.commit().await?;
        Ok((category, output))
    }

    /// Like [`modify`](Self::modify), addressing the category by one of its items.
    pub async fn modify_item<T, F>(
        &self,
        store_id: &str,
        item_id: &str,
        updated_by: Option<&str>,
        change: F,
    ) -> DbResult<(Category, T)>
    where
        F: FnOnce(&mut Category) -> CoreResult<T>,
    {
        let category = self.locate_item(store_id, item_id).await?;
        self.modify(store_id, &category.id, updated_by, change).await
    }

    /// Deletes an empty category and returns it.
    pub async fn delete(&self, store_id: &str, id: &str) -> DbResult<Category> {
        let mut tx = self.pool.begin().await?;

        let category = load_category(&mut *tx, store_id, id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(id.to_string()))?;
        category.ensure_deletable()?;

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(id = %id, "Category deleted");
        Ok(category)
    }

    /// Finds the category holding an item.
    ///
    /// Uses the item index, falling back to a document scan for rows written
    /// before the index existed.
    pub async fn locate_item(&self, store_id: &str, item_id: &str) -> DbResult<Category> {
        let category_id: Option<String> = sqlx::query_scalar(
            "SELECT category_id FROM catalog_items WHERE item_id = ?1 AND store_id = ?2",
        )
        .bind(item_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(category_id) = category_id {
            let category = self.get(store_id, &category_id).await?;
            if category.find_item(item_id).is_some() {
                return Ok(category);
            }
        }

        debug!(item_id = %item_id, "Item index miss, scanning categories");
        self.all(store_id)
            .await?
            .into_iter()
            .find(|c| c.find_item(item_id).is_some())
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()).into())
    }

    /// Item read model by id.
    pub async fn item(&self, store_id: &str, item_id: &str) -> DbResult<ItemView> {
        let category = self.locate_item(store_id, item_id).await?;
        let location = category
            .find_item(item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;
        Ok(ItemView::new(&category, location.subcategory, location.item))
    }

    /// Item read model by SKU.
    pub async fn item_by_sku(&self, store_id: &str, sku: &str) -> DbResult<ItemView> {
        let mut conn = self.pool.acquire().await?;
        let (category_id, item_id) = lookup_sku(&mut *conn, store_id, sku)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(sku.to_string()))?;
        drop(conn);

        let category = self.get(store_id, &category_id).await?;
        let location = category
            .find_item(&item_id)
            .ok_or_else(|| CoreError::ItemNotFound(sku.to_string()))?;
        Ok(ItemView::new(&category, location.subcategory, location.item))
    }

    /// Flat, filtered, paginated item listing across a store's categories.
    pub async fn list_items(
        &self,
        store_id: &str,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> DbResult<(Vec<ItemView>, u64)> {
        let mut views: Vec<ItemView> = self
            .all(store_id)
            .await?
            .iter()
            .flat_map(Category::item_views)
            .filter(|view| filter.matches(view))
            .collect();
        views.sort_by(|a, b| a.item.name.to_lowercase().cmp(&b.item.name.to_lowercase()));

        let total = views.len() as u64;
        Ok((page.slice(&views), total))
    }
}

// =============================================================================
// Connection-level helpers (shared with transactional workflows)
// =============================================================================

/// Reads one category document.
pub(crate) async fn load_category(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
) -> DbResult<Option<Category>> {
    let document: Option<String> =
        sqlx::query_scalar("SELECT document FROM categories WHERE id = ?1 AND store_id = ?2")
            .bind(id)
            .bind(store_id)
            .fetch_optional(&mut *conn)
            .await?;

    document
        .map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
        .transpose()
}

/// Resolves a SKU to `(category_id, item_id)` within a store.
pub(crate) async fn lookup_sku(
    conn: &mut SqliteConnection,
    store_id: &str,
    sku: &str,
) -> DbResult<Option<(String, String)>> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT category_id, item_id FROM catalog_items WHERE store_id = ?1 AND sku_key = ?2",
    )
    .bind(store_id)
    .bind(sku.trim().to_lowercase())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Upserts a category document and rebuilds its item index rows.
///
/// Must run inside a transaction so the document and the index never
/// disagree.
pub(crate) async fn write_category(
    conn: &mut SqliteConnection,
    category: &mut Category,
) -> DbResult<()> {
    category.normalize();
    let name_key = category.name.trim().to_lowercase();

    let clash: Option<String> = sqlx::query_scalar(
        "SELECT id FROM categories WHERE store_id = ?1 AND name_key = ?2 AND id <> ?3",
    )
    .bind(&category.store_id)
    .bind(&name_key)
    .bind(&category.id)
    .fetch_optional(&mut *conn)
    .await?;
    if clash.is_some() {
        return Err(CoreError::DuplicateName {
            entity: "Category".to_string(),
            name: category.name.clone(),
        }
        .into());
    }

    let document = serde_json::to_string(&*category)?;

    sqlx::query(
        r#"
        INSERT INTO categories (
            id, store_id, name, name_key, slug, is_active, document, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            name_key = excluded.name_key,
            slug = excluded.slug,
            is_active = excluded.is_active,
            document = excluded.document,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&category.id)
    .bind(&category.store_id)
    .bind(&category.name)
    .bind(&name_key)
    .bind(&category.slug)
    .bind(category.is_active)
    .bind(&document)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM catalog_items WHERE category_id = ?1")
        .bind(&category.id)
        .execute(&mut *conn)
        .await?;

    for location in category.item_locations() {
        let item = location.item;
        let sku_key = item.sku.trim().to_lowercase();

        let sku_taken: Option<String> = sqlx::query_scalar(
            "SELECT item_id FROM catalog_items WHERE store_id = ?1 AND sku_key = ?2",
        )
        .bind(&category.store_id)
        .bind(&sku_key)
        .fetch_optional(&mut *conn)
        .await?;
        if sku_taken.is_some() {
            return Err(DbError::duplicate("sku", &item.sku));
        }

        if let Some(barcode) = item.barcode.as_deref() {
            let barcode_taken: Option<String> = sqlx::query_scalar(
                "SELECT item_id FROM catalog_items WHERE store_id = ?1 AND barcode = ?2",
            )
            .bind(&category.store_id)
            .bind(barcode)
            .fetch_optional(&mut *conn)
            .await?;
            if barcode_taken.is_some() {
                return Err(DbError::duplicate("barcode", barcode));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO catalog_items (item_id, category_id, subcategory_id, store_id, sku_key, barcode)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&category.id)
        .bind(location.subcategory.map(|s| s.id.as_str()))
        .bind(&category.store_id)
        .bind(&sku_key)
        .bind(item.barcode.as_deref())
        .execute(&mut *conn)
        .await?;
    }

    debug!(id = %category.id, items = category.total_item_count(), "Category written");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockroom_core::catalog::{ItemPatch, NewItem, StoreRef};

    fn store() -> StoreRef {
        StoreRef {
            id: "store-1".to_string(),
            name: "Main Street".to_string(),
        }
    }

    fn new_item(name: &str, sku: &str) -> NewItem {
        NewItem {
            name: name.to_string(),
            sku: sku.to_string(),
            price_cents: 5000,
            unit: "pcs".to_string(),
            ..NewItem::default()
        }
    }

    async fn repo() -> CategoryRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories()
    }

    async fn beverages(repo: &CategoryRepository) -> Category {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        repo.create(&mut category).await.unwrap();
        category
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo().await;
        let category = beverages(&repo).await;

        let loaded = repo.get("store-1", &category.id).await.unwrap();
        assert_eq!(loaded.name, "Beverages");
        assert_eq!(loaded.slug, "beverages");

        // Other stores cannot see it
        let err = repo.get("store-2", &category.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_name_per_store() {
        let repo = repo().await;
        beverages(&repo).await;

        let mut dup = Category::new("BEVERAGES", None, "store-1", None).unwrap();
        let err = repo.create(&mut dup).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DuplicateName { .. })));

        let mut other_store = Category::new("Beverages", None, "store-2", None).unwrap();
        repo.create(&mut other_store).await.unwrap();
    }

    #[tokio::test]
    async fn test_beverages_soda_cola_blocks_delete() {
        let repo = repo().await;
        let category = beverages(&repo).await;

        let (_, soda_id) = repo
            .modify("store-1", &category.id, None, |c| {
                Ok(c.add_subcategory("Soda", None)?.id.clone())
            })
            .await
            .unwrap();
        let (category, _) = repo
            .modify("store-1", &category.id, Some("u1"), |c| {
                c.add_item(Some(&soda_id), new_item("Cola", "COLA1"), Some(&store()))
                    .map(|_| ())
            })
            .await
            .unwrap();

        assert_eq!(category.total_item_count(), 1);
        assert!(!category.can_delete());
        assert_eq!(category.updated_by.as_deref(), Some("u1"));

        let err = repo.delete("store-1", &category.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CategoryNotEmpty { .. })
        ));
        assert!(repo.get("store-1", &category.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_empty_category() {
        let repo = repo().await;
        let category = beverages(&repo).await;
        repo.delete("store-1", &category.id).await.unwrap();
        assert!(repo.get("store-1", &category.id).await.is_err());
    }

    #[tokio::test]
    async fn test_sku_unique_across_categories() {
        let repo = repo().await;
        let bev = beverages(&repo).await;
        let mut snacks = Category::new("Snacks", None, "store-1", None).unwrap();
        repo.create(&mut snacks).await.unwrap();

        repo.modify("store-1", &bev.id, None, |c| {
            c.add_item(None, new_item("Cola", "COLA1"), Some(&store()))
                .map(|_| ())
        })
        .await
        .unwrap();

        let err = repo
            .modify("store-1", &snacks.id, None, |c| {
                c.add_item(None, new_item("Cola chips", "cola1"), Some(&store()))
                    .map(|_| ())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Nothing was written to Snacks
        let snacks = repo.get("store-1", &snacks.id).await.unwrap();
        assert_eq!(snacks.total_item_count(), 0);
    }

    #[tokio::test]
    async fn test_item_lookup_and_update() {
        let repo = repo().await;
        let bev = beverages(&repo).await;

        let (_, item_id) = repo
            .modify("store-1", &bev.id, None, |c| {
                Ok(c.add_item(None, new_item("Cola", "COLA1"), Some(&store()))?
                    .id
                    .clone())
            })
            .await
            .unwrap();

        let view = repo.item_by_sku("store-1", "cola1").await.unwrap();
        assert_eq!(view.item.id, item_id);
        assert_eq!(view.category_name, "Beverages");

        repo.modify_item("store-1", &item_id, None, |c| {
            c.update_item(
                &item_id,
                ItemPatch {
                    stock: Some(3),
                    min_stock: Some(5),
                    ..ItemPatch::default()
                },
            )
            .map(|_| ())
        })
        .await
        .unwrap();

        let view = repo.item("store-1", &item_id).await.unwrap();
        assert_eq!(view.item.stock, 3);
        assert_eq!(view.stock_status, StockStatus::LowStock);

        let (low, total) = repo
            .list_items(
                "store-1",
                &ItemFilter {
                    low_stock_only: true,
                    ..ItemFilter::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(low[0].item.sku, "COLA1");

        let err = repo.item("store-1", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_search_and_paginate() {
        let repo = repo().await;
        for name in ["Beverages", "Bakery", "Dairy"] {
            let mut c = Category::new(name, None, "store-1", None).unwrap();
            repo.create(&mut c).await.unwrap();
        }

        let (page, total) = repo
            .list(
                "store-1",
                &CategoryFilter::default(),
                PageRequest::new(Some(1), Some(2)),
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "Bakery");

        let (found, total) = repo
            .list(
                "store-1",
                &CategoryFilter {
                    search: Some("dai".to_string()),
                    is_active: None,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "Dairy");
    }
}
