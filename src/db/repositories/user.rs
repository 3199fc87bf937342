//! User repository
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait on SQLite
//!
//! Defaults (role, active flag, timestamps) are left to the schema, so rows are
//! read back after every write.

use crate::models::{ListParams, NewUser, RoleTable, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, role, is_active, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user together with the extension row its role needs.
    /// A duplicate email is a constraint error and nothing is written.
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist every mutable field and bump `updated_at`
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    async fn count_active(&self) -> Result<i64>;

    async fn count_by_role(&self, role: UserRole) -> Result<i64>;

    /// Users created at or after `since`
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// One page of users, newest first, plus the total matching count
    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)>;

    /// Signup counts grouped by `YYYY-MM`, oldest month first
    async fn monthly_signups(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO users (email, password, first_name, last_name");
        if user.role.is_some() {
            builder.push(", role");
        }
        if user.is_active.is_some() {
            builder.push(", is_active");
        }
        builder.push(") VALUES (");

        let mut values = builder.separated(", ");
        values.push_bind(&user.email);
        values.push_bind(&user.password_hash);
        values.push_bind(&user.first_name);
        values.push_bind(&user.last_name);
        if let Some(role) = user.role {
            values.push_bind(role.as_str());
        }
        if let Some(is_active) = user.is_active {
            values.push_bind(is_active);
        }
        builder.push(")");

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let id = builder
            .build()
            .execute(&mut *tx)
            .await
            .context("Failed to create user")?
            .last_insert_rowid();

        if let Some(table) = user.role.and_then(RoleTable::for_role) {
            sqlx::query(&format!("INSERT INTO {} (user_id) VALUES (?)", table.table_name()))
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert into {}", table.table_name()))?;
        }

        tx.commit().await.context("Failed to commit user insert")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, password = ?, first_name = ?, last_name = ?, role = ?, is_active = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        scalar(&self.pool, sqlx::query("SELECT COUNT(*) FROM users"), "Failed to count users").await
    }

    async fn count_active(&self) -> Result<i64> {
        scalar(
            &self.pool,
            sqlx::query("SELECT COUNT(*) FROM users WHERE is_active = 1"),
            "Failed to count active users",
        )
        .await
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        scalar(
            &self.pool,
            sqlx::query("SELECT COUNT(*) FROM users WHERE role = ?").bind(role.as_str()),
            "Failed to count users by role",
        )
        .await
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        scalar(
            &self.pool,
            sqlx::query("SELECT COUNT(*) FROM users WHERE datetime(created_at) >= datetime(?)")
                .bind(sql_timestamp(since)),
            "Failed to count new users",
        )
        .await
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let pattern = params.search.as_deref().map(like_pattern);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE ?1 IS NULL
               OR email LIKE ?1 ESCAPE '\'
               OR first_name LIKE ?1 ESCAPE '\'
               OR last_name LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
            USER_COLUMNS
        ))
        .bind(&pattern)
        .bind(params.limit as i64)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;

        let total = scalar(
            &self.pool,
            sqlx::query(
                r#"
                SELECT COUNT(*)
                FROM users
                WHERE ?1 IS NULL
                   OR email LIKE ?1 ESCAPE '\'
                   OR first_name LIKE ?1 ESCAPE '\'
                   OR last_name LIKE ?1 ESCAPE '\'
                "#,
            )
            .bind(&pattern),
            "Failed to count listed users",
        )
        .await?;

        Ok((users, total))
    }

    async fn monthly_signups(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT strftime('%Y-%m', created_at) AS month, COUNT(*) AS count
            FROM users
            WHERE datetime(created_at) >= datetime(?)
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(sql_timestamp(since))
        .fetch_all(&self.pool)
        .await
        .context("Failed to group users by month")?;

        Ok(rows
            .iter()
            .map(|row| (row.get("month"), row.get("count")))
            .collect())
    }
}

async fn scalar<'q>(
    pool: &SqlitePool,
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    context: &'static str,
) -> Result<i64> {
    let row = query.fetch_one(pool).await.context(context)?;
    Ok(row.get(0))
}

/// Timestamp in the same layout as SQLite's CURRENT_TIMESTAMP
fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
