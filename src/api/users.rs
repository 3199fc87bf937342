//! User management endpoints (admin only)
//!
//! - GET /api/v1/users - Paginated list with search
//! - POST /api/v1/users - Create a user
//! - GET /api/v1/users/{id} - User with role memberships
//! - PUT /api/v1/users/{id} - Update a user
//! - DELETE /api/v1/users/{id} - Delete a user

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::ListQuery;
use crate::api::middleware::{audit_context, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{MessageResponse, UserDetailResponse, UserEnvelope, UserListResponse};
use crate::models::{CreateUserInput, ListParams, UpdateUserInput, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Absent fields are left unchanged; an empty name clears it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

/// GET /api/v1/users?page=&limit=&search=
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let params = ListParams::from(query);
    let result = state.user_service.list(&params).await?;
    Ok(Json(result.into()))
}

/// POST /api/v1/users
async fn create_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateUserInput {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        role: body.role,
        is_active: body.is_active,
    };

    let user = state
        .user_service
        .create_user(input, &audit_context(Some(&admin.0), &headers))
        .await?;

    Ok((StatusCode::CREATED, Json(UserEnvelope { user: user.into() })))
}

/// GET /api/v1/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let user = state
        .user_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let roles = state.user_service.role_profile(id).await?;

    Ok(Json(UserDetailResponse {
        user: user.into(),
        roles,
    }))
}

/// PUT /api/v1/users/{id}
async fn update_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let input = UpdateUserInput {
        email: body.email,
        password: body.password,
        first_name: body.first_name.map(Some),
        last_name: body.last_name.map(Some),
        role: body.role,
        is_active: body.is_active,
    };

    let user = state
        .user_service
        .update(id, input, &audit_context(Some(&admin.0), &headers))
        .await?;

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// DELETE /api/v1/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .user_service
        .delete(id, &audit_context(Some(&admin.0), &headers))
        .await?;

    Ok(Json(MessageResponse::new("User deleted successfully")))
}
