//! # Bill Repository
//!
//! Bills are immutable once written. Creating one is a transactional
//! workflow:
//!
//! ```text
//! BEGIN
//!   next bill number
//!   for each line: resolve item (id, else SKU) → deduct stock in its category
//!   write touched categories
//!   INSERT bill
//!   payment_method = credit → INSERT customer credit for the total
//! COMMIT
//! ```
//!
//! Any insufficient-stock line rolls back the whole bill.

use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::category::{load_category, lookup_sku, write_category};
use crate::repository::credit::insert_customer_credit;
use stockroom_core::ledger::{CreditTerms, CustomerCredit};
use stockroom_core::types::{next_bill_number, NewBill};
use stockroom_core::{Bill, Category, CoreError, PageRequest, PaymentMethod};

#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Creates a bill, deducting stock and opening a customer credit for
    /// credit sales.
    pub async fn create(
        &self,
        store_id: &str,
        input: NewBill,
        created_by: Option<&str>,
    ) -> DbResult<(Bill, Option<CustomerCredit>)> {
        let due_date = input.due_date;
        let mut tx = self.pool.begin().await?;

        let last: Option<String> = sqlx::query_scalar(
            "SELECT bill_number FROM bills ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;
        let bill = Bill::new(
            next_bill_number(last.as_deref()),
            store_id,
            input,
            created_by.map(str::to_string),
        )?;

        let mut categories: HashMap<String, Category> = HashMap::new();
        for line in &bill.items {
            let location = match line.item_id.as_deref() {
                Some(item_id) => locate_item_id(&mut *tx, store_id, item_id).await?,
                None => lookup_sku(&mut *tx, store_id, &line.sku).await?,
            };
            let Some((category_id, item_id)) = location else {
                debug!(sku = %line.sku, "Bill line has no catalog item; stock untouched");
                continue;
            };

            if !categories.contains_key(&category_id) {
                let category = load_category(&mut *tx, store_id, &category_id)
                    .await?
                    .ok_or_else(|| CoreError::CategoryNotFound(category_id.clone()))?;
                categories.insert(category_id.clone(), category);
            }
            let category = categories
                .get_mut(&category_id)
                .ok_or_else(|| CoreError::CategoryNotFound(category_id.clone()))?;
            category.deduct_stock(&item_id, line.quantity)?;
        }

        for category in categories.values_mut() {
            category.touch(created_by);
            write_category(&mut *tx, category).await?;
        }

        insert_bill(&mut *tx, &bill).await?;

        let credit = if bill.payment_method == PaymentMethod::Credit {
            let credit = CustomerCredit::new(
                &bill.id,
                &bill.bill_number,
                bill.customer_name.as_deref().unwrap_or_default(),
                bill.customer_phone.clone(),
                store_id,
                CreditTerms {
                    amount_cents: bill.total_cents,
                    due_date,
                    notes: None,
                    created_by: bill.created_by.clone(),
                },
            )?;
            insert_customer_credit(&mut *tx, &credit).await?;
            Some(credit)
        } else {
            None
        };

        tx.commit().await?;
        info!(
            bill_number = %bill.bill_number,
            total = bill.total_cents,
            lines = bill.items.len(),
            "Bill created"
        );

        Ok((bill, credit))
    }

    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<Bill> {
        sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ?1 AND store_id = ?2")
            .bind(id)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", id))
    }

    /// Newest first.
    pub async fn list(&self, store_id: &str, page: PageRequest) -> DbResult<(Vec<Bill>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE store_id = ?1")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;

        let bills = sqlx::query_as::<_, Bill>(
            "SELECT * FROM bills WHERE store_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        )
        .bind(store_id)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((bills, total as u64))
    }

    /// `(bill count, revenue in cents)` for a store.
    pub async fn revenue(&self, store_id: &str) -> DbResult<(u64, i64)> {
        let (count, revenue): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_cents), 0) FROM bills WHERE store_id = ?1",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((count as u64, revenue))
    }
}

async fn locate_item_id(
    conn: &mut SqliteConnection,
    store_id: &str,
    item_id: &str,
) -> DbResult<Option<(String, String)>> {
    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT category_id, item_id FROM catalog_items WHERE store_id = ?1 AND item_id = ?2",
    )
    .bind(store_id)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

async fn insert_bill(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bills (
            id, bill_number, store_id, customer_name, customer_phone, items,
            subtotal_cents, discount_cents, tax_cents, total_cents,
            payment_method, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&bill.id)
    .bind(&bill.bill_number)
    .bind(&bill.store_id)
    .bind(&bill.customer_name)
    .bind(&bill.customer_phone)
    .bind(Json(&bill.items))
    .bind(bill.subtotal_cents)
    .bind(bill.discount_cents)
    .bind(bill.tax_cents)
    .bind(bill.total_cents)
    .bind(bill.payment_method)
    .bind(&bill.created_by)
    .bind(bill.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
