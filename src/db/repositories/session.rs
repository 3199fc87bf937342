//! Session repository
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait on SQLite

use crate::models::{NewSession, Session};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &NewSession) -> Result<Session>;

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Delete one session, returning whether it existed
    async fn delete_by_token(&self, token: &str) -> Result<bool>;

    /// Delete all sessions for a user, e.g. when the account is disabled
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Delete sessions whose expiry is at or before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: SqlitePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &NewSession) -> Result<Session> {
        let result = sqlx::query(
            "INSERT INTO sessions (user_id, token, expires_at) VALUES (?, ?, ?)",
        )
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        let row = sqlx::query(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .context("Failed to read back session")?;

        Ok(row_to_session(&row))
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get session by token")?;

        Ok(row.as_ref().map(row_to_session))
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user sessions")?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE julianday(expires_at) <= julianday(?)")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected())
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token: row.get("token"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}
