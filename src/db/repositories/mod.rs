//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for one entity.

pub mod activity;
pub mod role;
pub mod session;
pub mod user;

pub use activity::{ActivityRepository, SqlxActivityRepository};
pub use role::{RoleRepository, SqlxRoleRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
