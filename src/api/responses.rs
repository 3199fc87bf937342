//! Shared API response types
//!
//! Every body is camelCase JSON. The same types are used by the HTTP client
//! to decode responses.

use serde::{Deserialize, Serialize};

use crate::models::{ActivityWithUser, PagedResult, RoleProfile, User, UserRole};
use crate::services::{DashboardStats, MonthlyCount};

/// Public view of a user; never includes the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// Login and registration result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

/// A single user together with their role memberships
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub user: UserResponse,
    pub roles: RoleProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

impl From<PagedResult<User>> for UserListResponse {
    fn from(result: PagedResult<User>) -> Self {
        let pagination = Pagination {
            page: result.page,
            limit: result.limit,
            total: result.total,
            total_pages: result.total_pages(),
        };
        Self {
            users: result.items.into_iter().map(UserResponse::from).collect(),
            pagination,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: DashboardStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub activity: Vec<ActivityWithUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthResponse {
    pub growth: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
