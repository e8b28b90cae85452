//! Department rows. Names are unique case-insensitively.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockroom_core::{Department, DepartmentInput};

#[derive(Debug, Clone)]
pub struct DepartmentRepository {
    pool: SqlitePool,
}

impl DepartmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DepartmentRepository { pool }
    }

    pub async fn create(&self, input: &DepartmentInput) -> DbResult<Department> {
        input.validate_new()?;

        let now = Utc::now();
        let department = Department {
            id: Uuid::new_v4().to_string(),
            name: input.name.as_deref().unwrap_or_default().trim().to_string(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        self.ensure_name_free(&department.name, &department.id).await?;

        sqlx::query(
            "INSERT INTO departments (id, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&department.id)
        .bind(&department.name)
        .bind(&department.description)
        .bind(department.created_at)
        .bind(department.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(department)
    }

    pub async fn get(&self, id: &str) -> DbResult<Department> {
        sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Department", id))
    }

    pub async fn list(&self) -> DbResult<Vec<Department>> {
        let departments =
            sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;
        Ok(departments)
    }

    pub async fn update(&self, id: &str, input: &DepartmentInput) -> DbResult<Department> {
        let mut department = self.get(id).await?;

        if let Some(name) = &input.name {
            stockroom_core::validation::validate_name("name", name, 100)?;
            department.name = name.trim().to_string();
            self.ensure_name_free(&department.name, &department.id).await?;
        }
        if input.description.is_some() {
            department.description = input.description.clone();
        }
        department.updated_at = Utc::now();

        sqlx::query("UPDATE departments SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(&department.id)
            .bind(&department.name)
            .bind(&department.description)
            .bind(department.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(department)
    }

    /// Deletes a department; its users keep working with no department.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM departments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Department", id));
        }
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, own_id: &str) -> DbResult<()> {
        let taken: Option<String> = sqlx::query_scalar(
            "SELECT id FROM departments WHERE name = ?1 COLLATE NOCASE AND id <> ?2",
        )
        .bind(name)
        .bind(own_id)
        .fetch_optional(&self.pool)
        .await?;
        match taken {
            Some(_) => Err(DbError::duplicate("name", name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockroom_core::{NewUser, Role};

    #[tokio::test]
    async fn test_department_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.departments();

        let dept = repo
            .create(&DepartmentInput {
                name: Some("Warehouse".into()),
                description: None,
            })
            .await
            .unwrap();

        let err = repo
            .create(&DepartmentInput {
                name: Some("WAREHOUSE".into()),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let renamed = repo
            .update(
                &dept.id,
                &DepartmentInput {
                    name: Some("Stockroom".into()),
                    description: Some("Back of house".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Stockroom");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_detaches_users() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dept = db
            .departments()
            .create(&DepartmentInput {
                name: Some("Sales".into()),
                description: None,
            })
            .await
            .unwrap();

        let user = db
            .users()
            .create(
                &NewUser {
                    name: "Sam".into(),
                    email: "sam@shop.io".into(),
                    password: "secret123".into(),
                    department_id: Some(dept.id.clone()),
                    ..NewUser::default()
                },
                Role::Employee,
            )
            .await
            .unwrap();
        assert_eq!(user.department_id.as_deref(), Some(dept.id.as_str()));

        db.departments().delete(&dept.id).await.unwrap();
        let user = db.users().get(&user.id).await.unwrap();
        assert!(user.department_id.is_none());
    }
}
