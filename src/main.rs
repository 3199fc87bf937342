//! admindash server

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admindash::{
    api::{self, AppState},
    config::Config,
    db,
    models::{actions, CreateUserInput, UserRole},
    services::AuditContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admindash=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting admindash...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    let state = AppState::new(pool, config.auth.clone());

    bootstrap_admin(&state, &config).await?;

    // Expired session sweep
    {
        let user_service = state.user_service.clone();
        let every = Duration::from_secs(config.auth.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(removed = n, "Expired sessions cleaned up"),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let app = api::build_router(state, &config.server.cors_origin)?;

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the configured admin account when the database has no users
async fn bootstrap_admin(state: &AppState, config: &Config) -> Result<()> {
    let Some((email, password)) = config.bootstrap.admin_credentials() else {
        return Ok(());
    };
    if !state.user_service.is_first_user().await? {
        return Ok(());
    }

    let input = CreateUserInput {
        email: email.to_string(),
        password: password.to_string(),
        first_name: None,
        last_name: None,
        role: Some(UserRole::Admin),
        is_active: Some(true),
    };
    let admin = state
        .user_service
        .create_user(input, &AuditContext::system())
        .await?;

    state
        .activity_service
        .record_for(
            &AuditContext::system(),
            actions::SYSTEM_BOOTSTRAP,
            Some(format!("initial admin {}", admin.email)),
        )
        .await;
    tracing::info!(user_id = admin.id, "Bootstrap admin created");

    Ok(())
}
