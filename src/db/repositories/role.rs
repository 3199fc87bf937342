//! Role extension repository
//!
//! Keeps `users.role` and the trainers/students/parents/admin tables in step.
//! Assignment rewrites both inside one transaction.

use crate::models::{RoleProfile, RoleTable, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Extension tables that hold a row for this user, sorted
    async fn memberships(&self, user_id: i64) -> Result<Vec<RoleTable>>;

    /// Role column plus memberships, or None for an unknown user
    async fn profile(&self, user_id: i64) -> Result<Option<RoleProfile>>;

    /// Set the role column and make the extension rows match it.
    /// Returns false when the user does not exist.
    async fn assign(&self, user_id: i64, role: UserRole) -> Result<bool>;
}

pub struct SqlxRoleRepository {
    pool: SqlitePool,
}

impl SqlxRoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn RoleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RoleRepository for SqlxRoleRepository {
    async fn memberships(&self, user_id: i64) -> Result<Vec<RoleTable>> {
        let mut found = Vec::new();
        for table in RoleTable::ALL {
            let row = sqlx::query(&format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?",
                table.table_name()
            ))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to read {} membership", table.table_name()))?;

            if row.get::<i64, _>(0) > 0 {
                found.push(table);
            }
        }
        found.sort();
        Ok(found)
    }

    async fn profile(&self, user_id: i64) -> Result<Option<RoleProfile>> {
        let row = sqlx::query("SELECT role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read user role")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role_str: String = row.get("role");
        let role = UserRole::from_str(&role_str)?;

        Ok(Some(RoleProfile {
            user_id,
            role,
            extensions: self.memberships(user_id).await?,
        }))
    }

    async fn assign(&self, user_id: i64, role: UserRole) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let updated = sqlx::query(
            "UPDATE users SET role = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(role.as_str())
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update user role")?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }

        for table in RoleTable::ALL {
            sqlx::query(&format!("DELETE FROM {} WHERE user_id = ?", table.table_name()))
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to clear {}", table.table_name()))?;
        }

        if let Some(table) = RoleTable::for_role(role) {
            sqlx::query(&format!("INSERT INTO {} (user_id) VALUES (?)", table.table_name()))
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert into {}", table.table_name()))?;
        }

        tx.commit().await.context("Failed to commit role assignment")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::NewUser;

    async fn setup() -> (SqlitePool, SqlxRoleRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let user = SqlxUserRepository::new(pool.clone())
            .create(&NewUser::new("roles@example.com", "hash"))
            .await
            .unwrap();
        (pool.clone(), SqlxRoleRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_plain_user_has_no_extensions() {
        let (_pool, repo, user_id) = setup().await;

        let profile = repo.profile(user_id).await.unwrap().expect("profile");

        assert_eq!(profile.role, UserRole::User);
        assert!(profile.extensions.is_empty());
        assert!(profile.is_consistent());
    }

    #[tokio::test]
    async fn test_assign_moves_extension_row() {
        let (_pool, repo, user_id) = setup().await;

        assert!(repo.assign(user_id, UserRole::Trainer).await.unwrap());
        assert_eq!(repo.memberships(user_id).await.unwrap(), vec![RoleTable::Trainer]);

        assert!(repo.assign(user_id, UserRole::Parent).await.unwrap());
        let profile = repo.profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.role, UserRole::Parent);
        assert_eq!(profile.extensions, vec![RoleTable::Parent]);

        assert!(repo.assign(user_id, UserRole::User).await.unwrap());
        let profile = repo.profile(user_id).await.unwrap().unwrap();
        assert!(profile.extensions.is_empty());
        assert!(profile.is_consistent());
    }

    #[tokio::test]
    async fn test_assign_repairs_stray_rows() {
        let (pool, repo, user_id) = setup().await;
        sqlx::query("INSERT INTO students (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO admin (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(!repo.profile(user_id).await.unwrap().unwrap().is_consistent());

        repo.assign(user_id, UserRole::Admin).await.unwrap();

        let profile = repo.profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.extensions, vec![RoleTable::Admin]);
        assert!(profile.is_consistent());
    }

    #[tokio::test]
    async fn test_assign_unknown_user() {
        let (_pool, repo, _user_id) = setup().await;

        assert!(!repo.assign(9999, UserRole::Admin).await.unwrap());
        assert!(repo.profile(9999).await.unwrap().is_none());
    }
}
