//! Supplier rows, scoped to a store. Free-form `extra` fields are stored
//! as a JSON column and passed through unvalidated.

use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use stockroom_core::{PageRequest, Supplier, SupplierInput};

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, store_id: &str, input: SupplierInput) -> DbResult<Supplier> {
        input.validate_new()?;
        let supplier = input.into_supplier(store_id);

        self.insert(&supplier).await?;
        info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn get(&self, store_id: &str, id: &str) -> DbResult<Supplier> {
        sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1 AND store_id = ?2")
            .bind(id)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn list(
        &self,
        store_id: &str,
        search: Option<&str>,
        page: PageRequest,
    ) -> DbResult<(Vec<Supplier>, u64)> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM suppliers WHERE store_id = ?1 AND (?2 IS NULL OR lower(name) LIKE ?2)",
        )
        .bind(store_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT * FROM suppliers
            WHERE store_id = ?1 AND (?2 IS NULL OR lower(name) LIKE ?2)
            ORDER BY name COLLATE NOCASE
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(store_id)
        .bind(&pattern)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((suppliers, total as u64))
    }

    pub async fn update(&self, store_id: &str, id: &str, input: SupplierInput) -> DbResult<Supplier> {
        input.validate_update()?;
        let mut supplier = self.get(store_id, id).await?;
        input.apply(&mut supplier);

        self.save(&supplier).await?;
        Ok(supplier)
    }

    pub async fn delete(&self, store_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1 AND store_id = ?2")
            .bind(id)
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        Ok(())
    }

    async fn insert(&self, supplier: &Supplier) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, store_id, name, contact_person, email, phone, address,
                tax_number, payment_terms, is_active, extra, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.store_id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.tax_number)
        .bind(&supplier.payment_terms)
        .bind(supplier.is_active)
        .bind(Json(&supplier.extra))
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, supplier: &Supplier) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE suppliers
            SET name = ?3, contact_person = ?4, email = ?5, phone = ?6, address = ?7,
                tax_number = ?8, payment_terms = ?9, is_active = ?10, extra = ?11, updated_at = ?12
            WHERE id = ?1 AND store_id = ?2
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.store_id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.tax_number)
        .bind(&supplier.payment_terms)
        .bind(supplier.is_active)
        .bind(Json(&supplier.extra))
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
