//! Database connectivity check
//!
//! Connects with the configured database settings, reads one row from
//! `users` and prints it. Exits non-zero if anything fails.
//!
//! Usage: `check-db [config.yml]`

use anyhow::{Context, Result};
use sqlx::Row;
use std::path::PathBuf;

use admindash::{config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yml"));

    let config = Config::load_with_env(&config_path)?;
    println!("Connecting to {}", config.database.url);

    let pool = db::create_pool(&config.database).await?;
    db::ping(&pool).await?;

    let row = sqlx::query("SELECT id, email, role, created_at FROM users ORDER BY id LIMIT 1")
        .fetch_optional(&pool)
        .await
        .context("Sample query on users failed")?;

    match row {
        Some(row) => {
            let id: i64 = row.get("id");
            let email: String = row.get("email");
            let role: String = row.get("role");
            let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
            println!("Connected. Sample user: #{} {} ({}) created {}", id, email, role, created_at);
        }
        None => println!("Connected. The users table is empty."),
    }

    pool.close().await;
    Ok(())
}
