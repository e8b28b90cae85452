//! # Credit Repositories
//!
//! Supplier credits (one per purchase order) and customer credits (one per
//! bill). Both are ledger documents with `status` and `balance_cents`
//! lifted into columns for filtering and totals.

use serde::de::DeserializeOwned;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use stockroom_core::ledger::{Credit, CustomerCredit, LedgerTotals};
use stockroom_core::{CoreError, CreditStatus, Ledger, PageRequest};

// =============================================================================
// Shared document helpers
// =============================================================================

async fn fetch_document<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    table: &'static str,
    key_column: &'static str,
    store_id: &str,
    key: &str,
) -> DbResult<Option<T>> {
    let sql = format!(
        "SELECT document FROM {} WHERE {} = ?1 AND store_id = ?2",
        table, key_column
    );
    let document: Option<String> = sqlx::query_scalar(&sql)
        .bind(key)
        .bind(store_id)
        .fetch_optional(&mut *conn)
        .await?;

    document
        .map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
        .transpose()
}

async fn list_documents<T: DeserializeOwned>(
    pool: &SqlitePool,
    table: &'static str,
    store_id: &str,
    status: Option<CreditStatus>,
    page: PageRequest,
) -> DbResult<(Vec<T>, u64)> {
    let status = status.map(|s| s.as_str());

    let count_sql = format!(
        "SELECT COUNT(*) FROM {} WHERE store_id = ?1 AND (?2 IS NULL OR status = ?2)",
        table
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(store_id)
        .bind(status)
        .fetch_one(pool)
        .await?;

    let list_sql = format!(
        "SELECT document FROM {} WHERE store_id = ?1 AND (?2 IS NULL OR status = ?2) \
         ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
        table
    );
    let documents: Vec<String> = sqlx::query_scalar(&list_sql)
        .bind(store_id)
        .bind(status)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let items = documents
        .iter()
        .map(|doc| serde_json::from_str(doc))
        .collect::<Result<Vec<T>, _>>()?;

    Ok((items, total as u64))
}

async fn ledger_totals<T: DeserializeOwned>(
    pool: &SqlitePool,
    table: &'static str,
    store_id: &str,
    ledger: fn(&T) -> &Ledger,
) -> DbResult<LedgerTotals> {
    let sql = format!("SELECT document FROM {} WHERE store_id = ?1", table);
    let documents: Vec<String> = sqlx::query_scalar(&sql)
        .bind(store_id)
        .fetch_all(pool)
        .await?;

    let records = documents
        .iter()
        .map(|doc| serde_json::from_str(doc))
        .collect::<Result<Vec<T>, _>>()?;

    Ok(records.iter().map(ledger).collect())
}

// =============================================================================
// Supplier credits
// =============================================================================

#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Inserts a credit. A purchase order can carry only one.
    pub async fn create(&self, credit: &Credit) -> DbResult<()> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM credits WHERE purchase_order_id = ?1")
                .bind(&credit.purchase_order_id)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(DbError::duplicate("purchaseOrderId", &credit.po_number));
        }

        let mut conn = self.pool.acquire().await?;
        write_credit(&mut *conn, credit).await?;
        info!(po_number = %credit.po_number, amount = credit.ledger.original_amount_cents, "Credit opened");
        Ok(())
    }

    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<Credit> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(&mut *conn, "credits", "id", store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Credit", id))
    }

    pub async fn get_by_purchase_order(
        &self,
        store_id: &str,
        purchase_order_id: &str,
    ) -> DbResult<Credit> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(
            &mut *conn,
            "credits",
            "purchase_order_id",
            store_id,
            purchase_order_id,
        )
        .await?
        .ok_or_else(|| DbError::not_found("Credit for purchase order", purchase_order_id))
    }

    pub async fn list(
        &self,
        store_id: &str,
        status: Option<CreditStatus>,
        page: PageRequest,
    ) -> DbResult<(Vec<Credit>, u64)> {
        list_documents(&self.pool, "credits", store_id, status, page).await
    }

    /// Loads a credit, applies `change` to its ledger and saves it.
    pub async fn modify<T, F>(&self, store_id: &str, id: &str, change: F) -> DbResult<(Credit, T)>
    where
        F: FnOnce(&mut Ledger) -> Result<T, CoreError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut credit: Credit = fetch_document(&mut *tx, "credits", "id", store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Credit", id))?;
        let output = change(&mut credit.ledger)?;
        credit.updated_at = chrono::Utc::now();
        write_credit(&mut *tx, &credit).await?;

        tx.commit().await?;
        Ok((credit, output))
    }

    pub async fn totals(&self, store_id: &str) -> DbResult<LedgerTotals> {
        ledger_totals(&self.pool, "credits", store_id, |c: &Credit| &c.ledger).await
    }
}

async fn write_credit(conn: &mut SqliteConnection, credit: &Credit) -> DbResult<()> {
    debug!(id = %credit.id, status = credit.ledger.status.as_str(), "Writing credit");
    let document = serde_json::to_string(credit)?;

    sqlx::query(
        r#"
        INSERT INTO credits (
            id, purchase_order_id, store_id, supplier_id, status, balance_cents, document, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            balance_cents = excluded.balance_cents,
            document = excluded.document,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&credit.id)
    .bind(&credit.purchase_order_id)
    .bind(&credit.store_id)
    .bind(&credit.supplier_id)
    .bind(credit.ledger.status.as_str())
    .bind(credit.ledger.balance_amount_cents)
    .bind(&document)
    .bind(credit.created_at)
    .bind(credit.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Customer credits
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerCreditRepository {
    pool: SqlitePool,
}

impl CustomerCreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerCreditRepository { pool }
    }

    /// Inserts a customer credit. A bill can carry only one.
    pub async fn create(&self, credit: &CustomerCredit) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_customer_credit(&mut *conn, credit).await
    }

    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<CustomerCredit> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(&mut *conn, "customer_credits", "id", store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer credit", id))
    }

    pub async fn get_by_bill(&self, store_id: &str, bill_id: &str) -> DbResult<CustomerCredit> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(&mut *conn, "customer_credits", "bill_id", store_id, bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer credit for bill", bill_id))
    }

    pub async fn list(
        &self,
        store_id: &str,
        status: Option<CreditStatus>,
        page: PageRequest,
    ) -> DbResult<(Vec<CustomerCredit>, u64)> {
        list_documents(&self.pool, "customer_credits", store_id, status, page).await
    }

    pub async fn modify<T, F>(
        &self,
        store_id: &str,
        id: &str,
        change: F,
    ) -> DbResult<(CustomerCredit, T)>
    where
        F: FnOnce(&mut Ledger) -> Result<T, CoreError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut credit: CustomerCredit =
            fetch_document(&mut *tx, "customer_credits", "id", store_id, id)
                .await?
                .ok_or_else(|| DbError::not_found("Customer credit", id))?;
        let output = change(&mut credit.ledger)?;
        credit.updated_at = chrono::Utc::now();
        write_customer_credit(&mut *tx, &credit).await?;

        tx.commit().await?;
        Ok((credit, output))
    }

    pub async fn totals(&self, store_id: &str) -> DbResult<LedgerTotals> {
        ledger_totals(&self.pool, "customer_credits", store_id, |c: &CustomerCredit| {
            &c.ledger
        })
        .await
    }
}

/// Inserts a customer credit, rejecting a second one for the same bill.
pub(crate) async fn insert_customer_credit(
    conn: &mut SqliteConnection,
    credit: &CustomerCredit,
) -> DbResult<()> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM customer_credits WHERE bill_id = ?1")
            .bind(&credit.bill_id)
            .fetch_optional(&mut *conn)
            .await?;
    if existing.is_some() {
        return Err(DbError::duplicate("billId", &credit.bill_number));
    }

    write_customer_credit(conn, credit).await?;
    info!(bill_number = %credit.bill_number, amount = credit.ledger.original_amount_cents, "Customer credit opened");
    Ok(())
}

async fn write_customer_credit(
    conn: &mut SqliteConnection,
    credit: &CustomerCredit,
) -> DbResult<()> {
    let document = serde_json::to_string(credit)?;

    sqlx::query(
        r#"
        INSERT INTO customer_credits (
            id, bill_id, store_id, status, balance_cents, document, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            balance_cents = excluded.balance_cents,
            document = excluded.document,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&credit.id)
    .bind(&credit.bill_id)
    .bind(&credit.store_id)
    .bind(credit.ledger.status.as_str())
    .bind(credit.ledger.balance_amount_cents)
    .bind(&document)
    .bind(credit.created_at)
    .bind(credit.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
