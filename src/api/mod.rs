//! API layer - HTTP handlers and routing
//!
//! - Auth endpoints (register, login, logout, current user)
//! - User management endpoints (admin)
//! - Dashboard endpoints (admin)
//! - Health check
//!
//! Every request passes through the request logger, CORS, input
//! sanitization and the request body logger, in that order.

pub mod auth;
pub mod common;
pub mod dashboard;
pub mod logging;
pub mod middleware;
pub mod responses;
pub mod sanitize;
pub mod users;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::api::responses::HealthResponse;

pub use middleware::{ApiError, AppState, AuthenticatedUser};
pub use sanitize::SanitizedBody;

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/users", users::router())
        .nest("/dashboard", dashboard::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    // Credentials are allowed so the session cookie is sent cross-origin
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(axum_middleware::from_fn(logging::log_request_body))
        .layer(axum_middleware::from_fn(sanitize::sanitize_input))
        .layer(cors)
        // Outermost, so the logged status includes every rejection below
        .layer(axum_middleware::from_fn(logging::log_request))
        .with_state(state))
}

/// GET /api/v1/health
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    crate::db::ping(&state.pool).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
