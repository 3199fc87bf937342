//! Services layer - Business logic
//!
//! Services implement the rules on top of the repositories:
//! - account and session lifecycle
//! - role assignment
//! - the activity trail and dashboard aggregates

pub mod activity;
pub mod dashboard;
pub mod password;
pub mod user;

pub use activity::{ActivityService, AuditContext};
pub use dashboard::{DashboardService, DashboardStats, MonthlyCount};
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
