//! Data models
//!
//! Entities stored in the database (User, Session, ActivityLog and the role
//! extension rows) plus the inputs used to create and update them.

mod activity;
mod role;
mod session;
mod user;

pub use activity::{actions, ActivityLog, ActivityUser, ActivityWithUser, NewActivity};
pub use role::{RoleProfile, RoleTable};
pub use session::{NewSession, Session};
pub use user::{CreateUserInput, ListParams, NewUser, PagedResult, UpdateUserInput, User, UserRole};
