//! # Dashboard Summary
//!
//! One read across every store-scoped table. Catalog figures are computed
//! from the category documents; the rest are SQL aggregates.

use serde::Serialize;
use sqlx::SqlitePool;
use ts_rs::TS;

use crate::error::DbResult;
use crate::repository::bill::BillRepository;
use crate::repository::category::CategoryRepository;
use crate::repository::credit::{CreditRepository, CustomerCreditRepository};
use crate::repository::purchase_order::PurchaseOrderRepository;
use stockroom_core::{Money, StockStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardSummary {
    pub category_count: u64,
    pub item_count: u64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub inventory_value_cents: i64,
    pub open_purchase_orders: u64,
    pub supplier_balance_cents: i64,
    pub customer_balance_cents: i64,
    pub bill_count: u64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    pub async fn summary(&self, store_id: &str) -> DbResult<DashboardSummary> {
        let categories = CategoryRepository::new(self.pool.clone()).all(store_id).await?;

        let mut summary = DashboardSummary {
            category_count: categories.len() as u64,
            ..DashboardSummary::default()
        };

        let mut inventory_value = Money::zero();
        for category in &categories {
            for location in category.item_locations() {
                let item = location.item;
                summary.item_count += 1;
                match item.stock_status() {
                    StockStatus::OutOfStock => summary.out_of_stock_count += 1,
                    StockStatus::LowStock => summary.low_stock_count += 1,
                    _ => {}
                }
                inventory_value = inventory_value.saturating_add(item.inventory_value());
            }
        }
        summary.inventory_value_cents = inventory_value.cents();

        summary.open_purchase_orders = PurchaseOrderRepository::new(self.pool.clone())
            .count_open(store_id)
            .await?;
        summary.supplier_balance_cents = CreditRepository::new(self.pool.clone())
            .totals(store_id)
            .await?
            .balance_amount_cents;
        summary.customer_balance_cents = CustomerCreditRepository::new(self.pool.clone())
            .totals(store_id)
            .await?
            .balance_amount_cents;

        let (bill_count, revenue) = BillRepository::new(self.pool.clone()).revenue(store_id).await?;
        summary.bill_count = bill_count;
        summary.revenue_cents = revenue;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockroom_core::catalog::{NewItem, StoreRef};
    use stockroom_core::Category;

    #[tokio::test]
    async fn test_empty_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let summary = db.dashboard().summary("store-1").await.unwrap();
        assert_eq!(summary, DashboardSummary::default());
    }

    #[tokio::test]
    async fn test_catalog_figures() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = StoreRef {
            id: "store-1".to_string(),
            name: "Main".to_string(),
        };

        let mut category = Category::new("Snacks", None, "store-1", None).unwrap();
        for (sku, stock, min) in [("CHIPS", 0, 5), ("NUTS", 3, 5), ("GUM", 50, 5)] {
            category
                .add_item(
                    None,
                    NewItem {
                        name: sku.to_string(),
                        sku: sku.to_string(),
                        cost_cents: 100,
                        stock,
                        min_stock: min,
                        ..NewItem::default()
                    },
                    Some(&store),
                )
                .unwrap();
        }
        db.categories().create(&mut category).await.unwrap();

        let summary = db.dashboard().summary("store-1").await.unwrap();
        assert_eq!(summary.category_count, 1);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.out_of_stock_count, 1);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.inventory_value_cents, 5_300);
    }
}
