//! # User Repository
//!
//! Users are relational rows; store membership lives in `user_stores`
//! and is loaded into [`User::stores`] on every read.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::password::hash_password;
use stockroom_core::{NewUser, PageRequest, Role, User, UserUpdate};

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Creates a user with the given role. The password is hashed here.
    pub async fn create(&self, input: &NewUser, role: Role) -> DbResult<User> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        if self.find_by_email(&email).await?.is_some() {
            return Err(DbError::duplicate("email", email));
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&input.password)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, department_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(input.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role)
        .bind(&input.department_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        replace_stores(&mut *tx, &id, &input.stores).await?;
        tx.commit().await?;

        info!(user_id = %id, role = %role, "User created");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;
        user.stores = load_stores(&mut *conn, &user.id).await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&mut *conn)
            .await?;

        match user {
            Some(mut user) => {
                user.stores = load_stores(&mut *conn, &user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn list(&self, filter: &UserFilter, page: PageRequest) -> DbResult<(Vec<User>, u64)> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        let role = filter.role.map(|r| r.as_str());

        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE (?1 IS NULL OR lower(name) LIKE ?1 OR email LIKE ?1)
              AND (?2 IS NULL OR role = ?2)
            "#,
        )
        .bind(&pattern)
        .bind(role)
        .fetch_one(&mut *conn)
        .await?;

        let mut users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE (?1 IS NULL OR lower(name) LIKE ?1 OR email LIKE ?1)
              AND (?2 IS NULL OR role = ?2)
            ORDER BY created_at DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(&pattern)
        .bind(role)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        for user in &mut users {
            user.stores = load_stores(&mut *conn, &user.id).await?;
        }

        Ok((users, total as u64))
    }

    pub async fn update(&self, id: &str, update: &UserUpdate) -> DbResult<User> {
        update.validate()?;
        let mut user = self.get(id).await?;

        if let Some(email) = &update.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                if self.find_by_email(&email).await?.is_some() {
                    return Err(DbError::duplicate("email", email));
                }
                user.email = email;
            }
        }
        if let Some(name) = &update.name {
            user.name = name.trim().to_string();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if update.department_id.is_some() {
            user.department_id = update.department_id.clone();
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE users
            SET name = ?2, email = ?3, role = ?4, department_id = ?5, is_active = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.department_id)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %id, "User updated");
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Replaces the stored hash. The caller verifies the old password.
    pub async fn set_password(&self, id: &str, new_password: &str) -> DbResult<()> {
        stockroom_core::validation::validate_password(new_password)?;
        let hash = hash_password(new_password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn record_login(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replaces the user's store memberships.
    pub async fn set_stores(&self, id: &str, store_ids: &[String]) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("User", id));
        }

        replace_stores(&mut *tx, id, store_ids).await?;
        tx.commit().await?;

        self.get(id).await
    }
}

async fn load_stores(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Vec<String>> {
    let stores: Vec<String> =
        sqlx::query_scalar("SELECT store_id FROM user_stores WHERE user_id = ?1 ORDER BY store_id")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(stores)
}

async fn replace_stores(
    conn: &mut SqliteConnection,
    user_id: &str,
    store_ids: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM user_stores WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    for store_id in store_ids {
        sqlx::query("INSERT OR IGNORE INTO user_stores (user_id, store_id) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(store_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::{Database, DbConfig};
    use stockroom_core::StoreInput;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let user = repo.create(&new_user("Ada@Example.com"), Role::Admin).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Admin);
        assert!(verify_password("secret123", &user.password_hash));

        let found = repo.find_by_email("ADA@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(repo.count().await.unwrap(), 1);

        let err = repo.create(&new_user("ada@example.com"), Role::Employee).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_store_membership() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db
            .stores()
            .create(&StoreInput {
                name: Some("Main".into()),
                code: Some("main".into()),
                ..StoreInput::default()
            })
            .await
            .unwrap();

        let user = db.users().create(&new_user("a@b.co"), Role::Cashier).await.unwrap();
        assert!(user.stores.is_empty());

        let user = db.users().set_stores(&user.id, &[store.id.clone()]).await.unwrap();
        assert!(user.belongs_to(&store.id));

        let err = db
            .users()
            .set_stores(&user.id, &["missing".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_password_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();
        let user = repo.create(&new_user("a@b.co"), Role::Employee).await.unwrap();

        let updated = repo
            .update(
                &user.id,
                &UserUpdate {
                    role: Some(Role::Manager),
                    is_active: Some(false),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Manager);
        assert!(!updated.is_active);

        repo.set_password(&user.id, "newsecret1").await.unwrap();
        let reloaded = repo.get(&user.id).await.unwrap();
        assert!(verify_password("newsecret1", &reloaded.password_hash));

        repo.delete(&user.id).await.unwrap();
        assert!(repo.get(&user.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();
        repo.create(&new_user("one@b.co"), Role::Admin).await.unwrap();
        repo.create(&new_user("two@b.co"), Role::Cashier).await.unwrap();

        let filter = UserFilter {
            role: Some(Role::Cashier),
            ..UserFilter::default()
        };
        let (users, total) = repo.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].email, "two@b.co");

        let filter = UserFilter {
            search: Some("ONE".into()),
            ..UserFilter::default()
        };
        let (_, total) = repo.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
    }
}
