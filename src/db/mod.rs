//! Database layer
//!
//! SQLite storage for users, sessions, the activity log and the role
//! extension tables. The schema lives in [`migrations`]; typed queries live in
//! [`repositories`].
//!
//! # Usage
//!
//! ```ignore
//! use admindash::config::DatabaseConfig;
//! use admindash::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};
