//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings and applied in
//! version order. Applied versions are recorded in the `_migrations` table.
//!
//! # Usage
//!
//! ```ignore
//! use admindash::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements, separated by `;`
    pub up: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password VARCHAR(255) NOT NULL,
                first_name VARCHAR(100),
                last_name VARCHAR(100),
                role VARCHAR(20) NOT NULL DEFAULT 'user'
                    CHECK (role IN ('user', 'trainer', 'student', 'parent', 'admin')),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
            CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                token TEXT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_token ON sessions(token);
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_activity_log",
        up: r#"
            -- Rows outlive their user: the reference is cleared, the entry stays.
            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                action VARCHAR(100) NOT NULL,
                details TEXT,
                ip_address VARCHAR(45),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_activity_log_created_at ON activity_log(created_at);
            CREATE INDEX IF NOT EXISTS idx_activity_log_user_id ON activity_log(user_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_role_tables",
        up: r#"
            CREATE TABLE IF NOT EXISTS trainers (
                user_id INTEGER PRIMARY KEY,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE
            );
            CREATE TABLE IF NOT EXISTS students (
                user_id INTEGER PRIMARY KEY,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE
            );
            CREATE TABLE IF NOT EXISTS parents (
                user_id INTEGER PRIMARY KEY,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE
            );
            CREATE TABLE IF NOT EXISTS admin (
                user_id INTEGER PRIMARY KEY,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE
            );
        "#,
    },
];

/// Run all pending migrations, returning how many were applied
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create migrations table")?;
    Ok(())
}

async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

/// Apply one migration and record it, atomically
async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in split_sql_statements(migration.up) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &SqlitePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> SqlitePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool, email: &str) -> i64 {
        sqlx::query("INSERT INTO users (email, password) VALUES (?, ?)")
            .bind(email)
            .bind("hash123")
            .execute(pool)
            .await
            .expect("Failed to create user")
            .last_insert_rowid()
    }

    async fn count(pool: &SqlitePool, sql: &str, id: i64) -> i64 {
        sqlx::query(sql)
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("Failed to count")
            .get(0)
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let first = run_migrations(&pool).await.expect("First run failed");
        let second = run_migrations(&pool).await.expect("Second run failed");

        assert_eq!(first, MIGRATIONS.len());
        assert_eq!(second, 0);
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_defaults_assigned_by_storage() {
        let pool = migrated_pool().await;
        let id = insert_user(&pool, "defaults@example.com").await;

        let row = sqlx::query("SELECT role, is_active, created_at, updated_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .expect("Failed to read user");

        let role: String = row.get("role");
        let is_active: bool = row.get("is_active");
        let created_at: DateTime<Utc> = row.get("created_at");
        let updated_at: DateTime<Utc> = row.get("updated_at");

        assert_eq!(role, "user");
        assert!(is_active);
        assert!(created_at <= Utc::now());
        assert_eq!(created_at, updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = migrated_pool().await;
        insert_user(&pool, "dup@example.com").await;

        let result = sqlx::query("INSERT INTO users (email, password) VALUES (?, ?)")
            .bind("dup@example.com")
            .bind("other-hash")
            .execute(&pool)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let pool = migrated_pool().await;

        let result = sqlx::query("INSERT INTO users (email, password, role) VALUES (?, ?, ?)")
            .bind("weird@example.com")
            .bind("hash")
            .bind("superuser")
            .execute(&pool)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_role_row_requires_existing_user() {
        let pool = migrated_pool().await;

        for table in ["trainers", "students", "parents", "admin"] {
            let result = sqlx::query(&format!("INSERT INTO {} (user_id) VALUES (?)", table))
                .bind(999i64)
                .execute(&pool)
                .await;
            assert!(result.is_err(), "{} accepted a dangling user id", table);
        }
    }

    #[tokio::test]
    async fn test_user_delete_cascades_to_role_rows() {
        let pool = migrated_pool().await;
        let id = insert_user(&pool, "cascade@example.com").await;

        for table in ["trainers", "students", "parents", "admin"] {
            sqlx::query(&format!("INSERT INTO {} (user_id) VALUES (?)", table))
                .bind(id)
                .execute(&pool)
                .await
                .expect("Failed to insert role row");
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .expect("Failed to delete user");

        for table in ["trainers", "students", "parents", "admin"] {
            let remaining = count(
                &pool,
                &format!("SELECT COUNT(*) FROM {} WHERE user_id = ?", table),
                id,
            )
            .await;
            assert_eq!(remaining, 0, "{} kept a row for a deleted user", table);
        }
    }

    #[tokio::test]
    async fn test_user_id_update_cascades_to_role_rows() {
        let pool = migrated_pool().await;
        let id = insert_user(&pool, "moved@example.com").await;

        sqlx::query("INSERT INTO trainers (user_id) VALUES (?)")
            .bind(id)
            .execute(&pool)
            .await
            .expect("Failed to insert trainer");

        sqlx::query("UPDATE users SET id = 500 WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .expect("Failed to move user");

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM trainers WHERE user_id = ?", 500).await, 1);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM trainers WHERE user_id = ?", id).await, 0);
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let pool = migrated_pool().await;

        let result = sqlx::query(
            "INSERT INTO sessions (user_id, token, expires_at) VALUES (?, ?, datetime('now', '+1 day'))",
        )
        .bind(999i64)
        .bind("token")
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_activity_survives_user_delete() {
        let pool = migrated_pool().await;
        let id = insert_user(&pool, "gone@example.com").await;

        sqlx::query("INSERT INTO activity_log (user_id, action) VALUES (?, ?)")
            .bind(id)
            .bind("user.login")
            .execute(&pool)
            .await
            .expect("Failed to insert activity");
        sqlx::query("INSERT INTO activity_log (action) VALUES (?)")
            .bind("system.start")
            .execute(&pool)
            .await
            .expect("System events have no user");

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .expect("Failed to delete user");

        let row = sqlx::query("SELECT COUNT(*), COUNT(user_id) FROM activity_log")
            .fetch_one(&pool)
            .await
            .unwrap();
        let total: i64 = row.get(0);
        let with_user: i64 = row.get(1);

        assert_eq!(total, 2);
        assert_eq!(with_user, 0);
    }

    #[test]
    fn test_split_sql_statements() {
        let statements = split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements.len(), 2);

        let statements = split_sql_statements("-- Comment\nCREATE TABLE a (id INT);\n-- trailing");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }

    #[test]
    fn test_migration_versions_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, i + 1);
        }
    }
}
