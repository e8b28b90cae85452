//! # Purchase Order Repository
//!
//! Purchase orders are stored as JSON documents with `po_number`, `status`
//! and `total_cents` lifted into columns for filtering.
//!
//! ## Receipt Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. load PO (store-scoped)                                             │
//! │   2. PurchaseOrder::receive()  → ReceivedLine per delivered line        │
//! │   3. for each line: SKU → catalog_items → category document             │
//! │        stock += qty, cost = line cost, batch appended                   │
//! │   4. write touched categories (+ index), write PO                       │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure rolls back every stock change and the PO status.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use ts_rs::TS;

use crate::error::{DbError, DbResult};
use crate::repository::category::{load_category, lookup_sku, write_category};
use stockroom_core::catalog::StockReceipt;
use stockroom_core::purchase_order::{next_po_number, NewPurchaseOrder, ReceiptLine};
use stockroom_core::{
    Category, CoreError, PageRequest, PurchaseOrder, PurchaseOrderStatus, ValidationError,
};

/// Catalog item that took stock from a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceivedItem {
    pub item_id: String,
    pub sku: String,
    pub quantity: i64,
    pub new_stock: i64,
    pub cost_price_cents: i64,
    pub batch_number: String,
}

/// Result of a receipt.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptOutcome {
    pub purchase_order: PurchaseOrder,
    pub updated_items: Vec<ReceivedItem>,
    /// SKUs recorded as received that match no catalog item in the store.
    pub unmatched_skus: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Number of the most recently created order, if any.
    pub async fn last_po_number(&self) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        last_po_number(&mut *conn).await
    }

    /// Preview of the number the next order will get.
    pub async fn next_po_number(&self) -> DbResult<String> {
        let last = self.last_po_number().await?;
        Ok(next_po_number(last.as_deref()))
    }

    /// Numbers and inserts a new pending order.
    pub async fn create(
        &self,
        store_id: &str,
        supplier_name: String,
        input: NewPurchaseOrder,
        created_by: Option<String>,
    ) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;

        let last = last_po_number(&mut *tx).await?;
        let order = PurchaseOrder::new(
            next_po_number(last.as_deref()),
            store_id,
            supplier_name,
            input,
            created_by,
        )?;
        write_order(&mut *tx, &order).await?;

        tx.commit().await?;
        info!(po_number = %order.po_number, total = order.total_cents, "Purchase order created");
        Ok(order)
    }

    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<PurchaseOrder> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut *conn, store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))
    }

    /// Lists orders of a store, newest first.
    pub async fn list(
        &self,
        store_id: &str,
        status: Option<PurchaseOrderStatus>,
        page: PageRequest,
    ) -> DbResult<(Vec<PurchaseOrder>, u64)> {
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_orders WHERE store_id = ?1 AND (?2 IS NULL OR status = ?2)",
        )
        .bind(store_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document FROM purchase_orders
            WHERE store_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, po_number DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(store_id)
        .bind(status)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let orders = documents
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<Result<Vec<PurchaseOrder>, _>>()?;

        Ok((orders, total as u64))
    }

    /// Loads an order, applies `change` and saves it.
    pub async fn modify<F>(&self, store_id: &str, id: &str, change: F) -> DbResult<PurchaseOrder>
    where
        F: FnOnce(&mut PurchaseOrder) -> Result<(), CoreError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut order = load_order(&mut *tx, store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))?;
        change(&mut order)?;
        order.recalculate_totals()?;
        write_order(&mut *tx, &order).await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Deletes a pending order.
    pub async fn delete(&self, store_id: &str, id: &str) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;

        let order = load_order(&mut *tx, store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))?;
        order.ensure_deletable()?;

        sqlx::query("DELETE FROM purchase_orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Receives stock against an order and applies it to catalog items.
    pub async fn receive(
        &self,
        store_id: &str,
        id: &str,
        receipt: &[ReceiptLine],
        received_by: Option<&str>,
    ) -> DbResult<ReceiptOutcome> {
        if receipt.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let mut order = load_order(&mut *tx, store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))?;
        let received = order.receive(receipt)?;

        let mut categories: HashMap<String, Category> = HashMap::new();
        let mut updated_items = Vec::new();
        let mut unmatched_skus = Vec::new();

        for line in received {
            let Some((category_id, item_id)) = lookup_sku(&mut *tx, &order.store_id, &line.sku).await?
            else {
                unmatched_skus.push(line.sku);
                continue;
            };

            if !categories.contains_key(&category_id) {
                let category = load_category(&mut *tx, &order.store_id, &category_id)
                    .await?
                    .ok_or_else(|| CoreError::CategoryNotFound(category_id.clone()))?;
                categories.insert(category_id.clone(), category);
            }
            let category = categories
                .get_mut(&category_id)
                .ok_or_else(|| CoreError::CategoryNotFound(category_id.clone()))?;

            let item = category.receive_stock(
                &item_id,
                StockReceipt {
                    quantity: line.quantity,
                    cost_price_cents: line.cost_price_cents,
                    batch_number: line.batch_number.clone(),
                    purchase_order_number: order.po_number.clone(),
                },
            )?;

            updated_items.push(ReceivedItem {
                item_id: item.id.clone(),
                sku: item.sku.clone(),
                quantity: line.quantity,
                new_stock: item.stock,
                cost_price_cents: line.cost_price_cents,
                batch_number: line.batch_number,
            });
        }

        for category in categories.values_mut() {
            category.touch(received_by);
            write_category(&mut *tx, category).await?;
        }
        write_order(&mut *tx, &order).await?;

        tx.commit().await?;
        info!(
            po_number = %order.po_number,
            status = %order.status,
            items = updated_items.len(),
            unmatched = unmatched_skus.len(),
            "Purchase order received"
        );

        Ok(ReceiptOutcome {
            purchase_order: order,
            updated_items,
            unmatched_skus,
        })
    }

    /// Number of pending or partially received orders in a store.
    pub async fn count_open(&self, store_id: &str) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_orders WHERE store_id = ?1 AND status IN ('pending', 'partially_received')",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn last_po_number(conn: &mut SqliteConnection) -> DbResult<Option<String>> {
    let number: Option<String> = sqlx::query_scalar(
        "SELECT po_number FROM purchase_orders ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(number)
}

pub(crate) async fn load_order(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
) -> DbResult<Option<PurchaseOrder>> {
    let document: Option<String> =
        sqlx::query_scalar("SELECT document FROM purchase_orders WHERE id = ?1 AND store_id = ?2")
            .bind(id)
            .bind(store_id)
            .fetch_optional(&mut *conn)
            .await?;

    document
        .map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
        .transpose()
}

async fn write_order(conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
    debug!(po_number = %order.po_number, status = %order.status, "Writing purchase order");
    let document = serde_json::to_string(order)?;

    sqlx::query(
        r#"
        INSERT INTO purchase_orders (
            id, po_number, store_id, supplier_id, status, total_cents, document, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            total_cents = excluded.total_cents,
            document = excluded.document,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&order.id)
    .bind(&order.po_number)
    .bind(&order.store_id)
    .bind(&order.supplier_id)
    .bind(order.status.as_str())
    .bind(order.total_cents)
    .bind(&document)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockroom_core::catalog::{NewItem, StoreRef};
    use stockroom_core::purchase_order::{PurchaseOrderLineInput, PurchaseOrderUpdate};

    fn line(sku: &str, quantity: i64, cost: i64) -> PurchaseOrderLineInput {
        PurchaseOrderLineInput {
            item_id: None,
            name: format!("Item {}", sku),
            sku: sku.to_string(),
            quantity,
            unit: "pcs".to_string(),
            cost_price_cents: cost,
        }
    }

    fn order_input(lines: Vec<PurchaseOrderLineInput>) -> NewPurchaseOrder {
        NewPurchaseOrder {
            supplier_id: "sup-1".to_string(),
            items: lines,
            ..NewPurchaseOrder::default()
        }
    }

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = StoreRef {
            id: "store-1".to_string(),
            name: "Main".to_string(),
        };

        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let item_id = category
            .add_item(
                None,
                NewItem {
                    name: "Cola".to_string(),
                    sku: "COLA1".to_string(),
                    price_cents: 5000,
                    cost_cents: 400,
                    ..NewItem::default()
                },
                Some(&store),
            )
            .unwrap()
            .id
            .clone();
        db.categories().create(&mut category).await.unwrap();

        (db, item_id)
    }

    #[tokio::test]
    async fn test_numbering_is_sequential() {
        let (db, _) = seeded().await;
        let repo = db.purchase_orders();

        assert_eq!(repo.next_po_number().await.unwrap(), "PO-0001");
        let first = repo
            .create("store-1", "Acme".into(), order_input(vec![line("A", 1, 100)]), None)
            .await
            .unwrap();
        let second = repo
            .create("store-1", "Acme".into(), order_input(vec![line("A", 1, 100)]), None)
            .await
            .unwrap();

        assert_eq!(first.po_number, "PO-0001");
        assert_eq!(second.po_number, "PO-0002");
        assert_eq!(repo.next_po_number().await.unwrap(), "PO-0003");
    }

    #[tokio::test]
    async fn test_receive_ten_by_five_updates_stock_and_cost() {
        let (db, item_id) = seeded().await;
        let repo = db.purchase_orders();

        let order = repo
            .create("store-1", "Acme".into(), order_input(vec![line("COLA1", 10, 500)]), None)
            .await
            .unwrap();
        assert_eq!(order.subtotal_cents, 5000);
        assert_eq!(order.total_cents, 5000);

        let outcome = repo
            .receive(
                "store-1",
                &order.id,
                &[ReceiptLine {
                    sku: "COLA1".to_string(),
                    received_quantity: 10,
                }],
                Some("u1"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.purchase_order.status, PurchaseOrderStatus::Completed);
        assert!(outcome.unmatched_skus.is_empty());
        assert_eq!(outcome.updated_items[0].new_stock, 10);

        let item = db.categories().item("store-1", &item_id).await.unwrap();
        assert_eq!(item.item.stock, 10);
        assert_eq!(item.item.cost_cents, 500);
        assert_eq!(item.item.batches.len(), 1);
        assert_eq!(item.item.batches[0].batch_number, "PO-0001-1");
        assert_eq!(item.calculated_stock, 10);

        let stored = repo.get("store-1", &order.id).await.unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_receive_reports_unmatched_skus() {
        let (db, _) = seeded().await;
        let repo = db.purchase_orders();

        let order = repo
            .create(
                "store-1",
                "Acme".into(),
                order_input(vec![line("COLA1", 5, 500), line("GHOST", 2, 100)]),
                None,
            )
            .await
            .unwrap();

        let outcome = repo
            .receive(
                "store-1",
                &order.id,
                &[ReceiptLine {
                    sku: "GHOST".to_string(),
                    received_quantity: 2,
                }],
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.unmatched_skus, vec!["GHOST".to_string()]);
        assert!(outcome.updated_items.is_empty());
        assert_eq!(
            outcome.purchase_order.status,
            PurchaseOrderStatus::PartiallyReceived
        );
    }

    #[tokio::test]
    async fn test_rejected_receipt_changes_nothing() {
        let (db, item_id) = seeded().await;
        let repo = db.purchase_orders();

        let order = repo
            .create("store-1", "Acme".into(), order_input(vec![line("COLA1", 5, 500)]), None)
            .await
            .unwrap();

        let err = repo
            .receive(
                "store-1",
                &order.id,
                &[ReceiptLine {
                    sku: "COLA1".to_string(),
                    received_quantity: 6,
                }],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ReceiptExceedsOrdered { .. })
        ));

        let item = db.categories().item("store-1", &item_id).await.unwrap();
        assert_eq!(item.item.stock, 0);
        let stored = repo.get("store-1", &order.id).await.unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_cancel_delete_rules() {
        let (db, _) = seeded().await;
        let repo = db.purchase_orders();

        let order = repo
            .create("store-1", "Acme".into(), order_input(vec![line("A", 2, 100)]), None)
            .await
            .unwrap();

        let updated = repo
            .modify("store-1", &order.id, |po| {
                po.apply_update(PurchaseOrderUpdate {
                    shipping_cents: Some(250),
                    ..PurchaseOrderUpdate::default()
                })
            })
            .await
            .unwrap();
        assert_eq!(updated.total_cents, 450);

        let cancelled = repo
            .modify("store-1", &order.id, PurchaseOrder::cancel)
            .await
            .unwrap();
        assert_eq!(cancelled.status, PurchaseOrderStatus::Cancelled);

        let err = repo.delete("store-1", &order.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidOrderStatus { .. })
        ));

        let (orders, total) = repo
            .list(
                "store-1",
                Some(PurchaseOrderStatus::Cancelled),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(orders[0].id, order.id);

        let pending = repo
            .create("store-1", "Acme".into(), order_input(vec![line("A", 1, 100)]), None)
            .await
            .unwrap();
        repo.delete("store-1", &pending.id).await.unwrap();
        assert!(repo.get("store-1", &pending.id).await.unwrap_err().is_not_found());
    }
}
