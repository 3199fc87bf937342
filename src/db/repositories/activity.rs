//! Activity log repository
//!
//! Append-only: there is no update or delete.

use crate::models::{ActivityLog, ActivityUser, ActivityWithUser, NewActivity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append(&self, activity: &NewActivity) -> Result<ActivityLog>;

    /// Most recent entries first, joined with the acting user when one still exists
    async fn recent(&self, limit: i64) -> Result<Vec<ActivityWithUser>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxActivityRepository {
    pool: SqlitePool,
}

impl SqlxActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ActivityRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ActivityRepository for SqlxActivityRepository {
    async fn append(&self, activity: &NewActivity) -> Result<ActivityLog> {
        let result = sqlx::query(
            "INSERT INTO activity_log (user_id, action, details, ip_address) VALUES (?, ?, ?, ?)",
        )
        .bind(activity.user_id)
        .bind(&activity.action)
        .bind(&activity.details)
        .bind(&activity.ip_address)
        .execute(&self.pool)
        .await
        .context("Failed to append activity")?;

        let row = sqlx::query(
            "SELECT id, user_id, action, details, ip_address, created_at FROM activity_log WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .context("Failed to read back activity")?;

        Ok(row_to_activity(&row))
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ActivityWithUser>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.user_id, a.action, a.details, a.ip_address, a.created_at,
                   u.id AS joined_user_id, u.email, u.first_name, u.last_name
            FROM activity_log a
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent activity")?;

        Ok(rows
            .iter()
            .map(|row| {
                let user = row
                    .get::<Option<i64>, _>("joined_user_id")
                    .map(|id| ActivityUser {
                        id,
                        email: row.get("email"),
                        first_name: row.get("first_name"),
                        last_name: row.get("last_name"),
                    });
                ActivityWithUser {
                    entry: row_to_activity(row),
                    user,
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count activity")?;
        Ok(row.get(0))
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> ActivityLog {
    ActivityLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        action: row.get("action"),
        details: row.get("details"),
        ip_address: row.get("ip_address"),
        created_at: row.get("created_at"),
    }
}
