//! User model
//!
//! Defines the User entity, its role enumeration and the inputs used to
//! create and update accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A dashboard account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Storage-assigned sequential identifier
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2), stored in the `password` column
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    /// Inactive accounts cannot log in
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Account role.
///
/// Every role except `User` has a matching extension table
/// (see [`crate::models::RoleTable`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Trainer,
    Student,
    Parent,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::User,
        UserRole::Trainer,
        UserRole::Student,
        UserRole::Parent,
        UserRole::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Trainer => "trainer",
            UserRole::Student => "student",
            UserRole::Parent => "parent",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "trainer" => Ok(UserRole::Trainer),
            "student" => Ok(UserRole::Student),
            "parent" => Ok(UserRole::Parent),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Row values for a new user; id, timestamps and defaults come from storage
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    /// Already-hashed password
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `None` leaves the storage default (`user`)
    pub role: Option<UserRole>,
    /// `None` leaves the storage default (active)
    pub is_active: Option<bool>,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: None,
            last_name: None,
            role: None,
            is_active: None,
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }
}

/// Input for creating a user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Partial update for a user; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    /// Plaintext password (will be hashed)
    pub password: Option<String>,
    /// `Some(None)` clears the name
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Pagination and search parameters for user listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
    /// Case-insensitive substring matched against email and names
    pub search: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

impl ListParams {
    /// Create parameters, clamping page to >= 1 and limit to 1..=100
    pub fn new(page: u32, limit: u32, search: Option<String>) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, 100),
            search: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of matching items across all pages
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64 + self.limit as u64 - 1) / self.limit as u64) as u32
    }
}
