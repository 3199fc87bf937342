//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Create an account (first one becomes admin)
//! - POST /api/v1/auth/login - Log in, sets the session cookie
//! - POST /api/v1/auth/logout - Delete the session, clears the cookie
//! - GET /api/v1/auth/me - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    audit_context, clear_session_cookie, extract_session_token, session_cookie, ApiError,
    AppState, AuthenticatedUser,
};
use crate::api::responses::{AuthResponse, UserEnvelope};
use crate::services::{LoginInput, RegisterInput};

/// Request body for registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request body for login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Routes that need no session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = RegisterInput {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
    };

    let (user, session) = state
        .user_service
        .register(input, &audit_context(None, &headers))
        .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie(&session.token, &state.auth)?);

    Ok((
        StatusCode::CREATED,
        response_headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.token,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state
        .user_service
        .login(
            LoginInput::new(body.email, body.password),
            &audit_context(None, &headers),
        )
        .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie(&session.token, &state.auth)?);

    Ok((
        response_headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.token,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state
        .user_service
        .logout(&token, &audit_context(Some(&user.0), &headers))
        .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, clear_session_cookie(&state.auth));

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me
async fn me(user: AuthenticatedUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        user: user.0.into(),
    })
}
