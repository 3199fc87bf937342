//! ApiClient against a live server on a loopback port

use reqwest::StatusCode;

use admindash::api::auth::RegisterRequest;
use admindash::api::users::{CreateUserRequest, UpdateUserRequest};
use admindash::api::{build_router, AppState};
use admindash::client::{ApiClient, ClientError};
use admindash::config::AuthConfig;
use admindash::db::{create_test_pool, migrations};
use admindash::models::UserRole;

async fn spawn_server() -> String {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(pool, AuthConfig::default());
    let app = build_router(state, "http://localhost:5173").expect("Failed to build router");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "password123".to_string(),
        first_name: Some("Ada".to_string()),
        last_name: None,
    }
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_session_cookie_is_reused() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();

    let auth = client.register(&registration("admin@example.com")).await.unwrap();
    assert_eq!(auth.user.role, UserRole::Admin);

    // no bearer token is sent; the cookie carries the session
    let me = client.me().await.unwrap();
    assert_eq!(me.email, "admin@example.com");
    assert_eq!(me.first_name.as_deref(), Some("Ada"));

    client.logout().await.unwrap();
    let err = client.me().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_error_messages_are_surfaced() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();
    client.register(&registration("admin@example.com")).await.unwrap();

    let anonymous = ApiClient::new(&base).unwrap();
    match anonymous.me().await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(message, "Missing authentication token");
        }
        other => panic!("expected an API error, got {:?}", other.map(|u| u.email)),
    }

    match anonymous.login("admin@example.com", "not-the-password").await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("expected an API error, got {:?}", other.map(|a| a.user.email)),
    }
}

#[tokio::test]
async fn test_admin_pages() {
    let base = spawn_server().await;
    let admin = ApiClient::new(&base).unwrap();
    admin.register(&registration("admin@example.com")).await.unwrap();

    let member = admin
        .create_user(&CreateUserRequest {
            email: "member@example.com".to_string(),
            password: "password123".to_string(),
            first_name: None,
            last_name: Some("Member".to_string()),
            role: Some(UserRole::Student),
            is_active: None,
        })
        .await
        .unwrap();
    assert_eq!(member.role, UserRole::Student);

    let list = admin.list_users(1, 10, None).await.unwrap();
    assert_eq!(list.pagination.total, 2);
    assert_eq!(list.users.len(), 2);

    let searched = admin.list_users(1, 10, Some("member")).await.unwrap();
    assert_eq!(searched.pagination.total, 1);
    assert_eq!(searched.users[0].id, member.id);

    let updated = admin
        .update_user(
            member.id,
            &UpdateUserRequest {
                first_name: Some("Mia".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Mia"));
    assert_eq!(updated.last_name.as_deref(), Some("Member"));

    let detail = admin.get_user(member.id).await.unwrap();
    assert_eq!(detail.user.email, "member@example.com");

    let stats = admin.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_admins, 1);

    let growth = admin.user_growth().await.unwrap();
    assert_eq!(growth.len(), 6);

    let deleted = admin.delete_user(member.id).await.unwrap();
    assert_eq!(deleted.message, "User deleted successfully");

    let activity = admin.recent_activity(Some(2)).await.unwrap();
    assert_eq!(activity.len(), 2);
    assert_eq!(activity[0].entry.action, "user.deleted");

    let err = admin.get_user(member.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let base = spawn_server().await;
    let admin = ApiClient::new(&base).unwrap();
    admin.register(&registration("admin@example.com")).await.unwrap();

    let user = ApiClient::new(&base).unwrap();
    user.register(&registration("user@example.com")).await.unwrap();

    let err = user.dashboard_stats().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(err.to_string(), "Admin privileges required (HTTP 403 Forbidden)");
}
