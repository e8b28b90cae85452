//! Store rows. Codes are unique and kept uppercased.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockroom_core::{PageRequest, Store, StoreInput};

#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    pub async fn create(&self, input: &StoreInput) -> DbResult<Store> {
        input.validate_new()?;

        let now = Utc::now();
        let store = Store {
            id: Uuid::new_v4().to_string(),
            name: input.name.as_deref().unwrap_or_default().trim().to_string(),
            code: input.code.as_deref().unwrap_or_default().trim().to_uppercase(),
            address: input.address.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.ensure_code_free(&store.code, &store.id).await?;

        sqlx::query(
            r#"
            INSERT INTO stores (id, name, code, address, phone, email, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.code)
        .bind(&store.address)
        .bind(&store.phone)
        .bind(&store.email)
        .bind(store.is_active)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await?;

        info!(store_id = %store.id, code = %store.code, "Store created");
        Ok(store)
    }

    pub async fn get(&self, id: &str) -> DbResult<Store> {
        sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Store", id))
    }

    pub async fn list(&self, page: PageRequest) -> DbResult<(Vec<Store>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;

        let stores = sqlx::query_as::<_, Store>(
            "SELECT * FROM stores ORDER BY name COLLATE NOCASE LIMIT ?1 OFFSET ?2",
        )
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((stores, total as u64))
    }

    /// Stores whose ids are in `ids`, for a user's membership list.
    pub async fn by_ids(&self, ids: &[String]) -> DbResult<Vec<Store>> {
        let mut stores = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(store) = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            {
                stores.push(store);
            }
        }
        Ok(stores)
    }

    pub async fn update(&self, id: &str, input: &StoreInput) -> DbResult<Store> {
        input.validate_update()?;
        let mut store = self.get(id).await?;

        if let Some(name) = &input.name {
            store.name = name.trim().to_string();
        }
        if let Some(code) = &input.code {
            store.code = code.trim().to_uppercase();
            self.ensure_code_free(&store.code, &store.id).await?;
        }
        if input.address.is_some() {
            store.address = input.address.clone();
        }
        if input.phone.is_some() {
            store.phone = input.phone.clone();
        }
        if input.email.is_some() {
            store.email = input.email.clone();
        }
        if let Some(active) = input.is_active {
            store.is_active = active;
        }
        store.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE stores
            SET name = ?2, code = ?3, address = ?4, phone = ?5, email = ?6, is_active = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.code)
        .bind(&store.address)
        .bind(&store.phone)
        .bind(&store.email)
        .bind(store.is_active)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(store)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM stores WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Store", id));
        }
        info!(store_id = %id, "Store deleted");
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, own_id: &str) -> DbResult<()> {
        let taken: Option<String> =
            sqlx::query_scalar("SELECT id FROM stores WHERE code = ?1 AND id <> ?2")
                .bind(code)
                .bind(own_id)
                .fetch_optional(&self.pool)
                .await?;
        match taken {
            Some(_) => Err(DbError::duplicate("code", code)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn input(name: &str, code: &str) -> StoreInput {
        StoreInput {
            name: Some(name.to_string()),
            code: Some(code.to_string()),
            ..StoreInput::default()
        }
    }

    #[tokio::test]
    async fn test_store_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.stores();

        let store = repo.create(&input("Main Street", "ms01")).await.unwrap();
        assert_eq!(store.code, "MS01");
        assert!(store.is_active);

        let err = repo.create(&input("Other", "MS01")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let updated = repo
            .update(
                &store.id,
                &StoreInput {
                    phone: Some("555-0100".into()),
                    is_active: Some(false),
                    ..StoreInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert!(!updated.is_active);

        let (stores, total) = repo.list(PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(stores[0].id, store.id);

        repo.delete(&store.id).await.unwrap();
        assert!(repo.get(&store.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_missing_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .stores()
            .create(&StoreInput {
                name: Some("No Code".into()),
                ..StoreInput::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }
}
