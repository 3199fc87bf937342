//! User service
//!
//! Implements business logic for user management:
//! - Registration (the first account becomes admin)
//! - Login/logout and session validation
//! - Admin CRUD over accounts, including role assignment
//!
//! Every mutating operation leaves an entry in the activity log.

use crate::config::MAX_SESSION_TTL_HOURS;
use crate::db::repositories::{RoleRepository, SessionRepository, UserRepository};
use crate::models::{
    actions, CreateUserInput, ListParams, NewSession, NewUser, PagedResult, RoleProfile, Session,
    UpdateUserInput, User, UserRole,
};
use crate::services::activity::{ActivityService, AuditContext};
use crate::services::password::{check_password_policy, hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session lifetime in hours (7 days)
const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

const MAX_EMAIL_LENGTH: usize = 255;
const MAX_NAME_LENGTH: usize = 100;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or disabled account)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for self-service registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    role_repo: Arc<dyn RoleRepository>,
    activity: Arc<ActivityService>,
    session_ttl: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        role_repo: Arc<dyn RoleRepository>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            role_repo,
            activity,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    /// Override the session lifetime, clamped to `1..=MAX_SESSION_TTL_HOURS`
    pub fn with_session_ttl_hours(mut self, hours: i64) -> Self {
        self.session_ttl = Duration::hours(hours.clamp(1, MAX_SESSION_TTL_HOURS));
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Register a new account and open a session for it.
    ///
    /// The first account in an empty database becomes admin; later ones get
    /// the default role.
    pub async fn register(
        &self,
        input: RegisterInput,
        ctx: &AuditContext,
    ) -> Result<(User, Session), UserServiceError> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;
        validate_name(input.first_name.as_deref())?;
        validate_name(input.last_name.as_deref())?;
        self.ensure_email_free(&email).await?;

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let new_user = NewUser::new(email, password_hash)
            .with_names(trim_name(input.first_name), trim_name(input.last_name));
        let user = self.insert_with_role(new_user, role).await?;

        let session = self.create_session(user.id).await?;

        let ctx = AuditContext::new(Some(user.id), ctx.ip_address.clone());
        self.activity
            .record_for(&ctx, actions::USER_REGISTERED, Some(user.email.clone()))
            .await;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok((user, session))
    }

    /// Create an account on behalf of an admin
    pub async fn create_user(
        &self,
        input: CreateUserInput,
        ctx: &AuditContext,
    ) -> Result<User, UserServiceError> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;
        validate_name(input.first_name.as_deref())?;
        validate_name(input.last_name.as_deref())?;
        self.ensure_email_free(&email).await?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let mut new_user = NewUser::new(email, password_hash)
            .with_names(trim_name(input.first_name), trim_name(input.last_name));
        new_user.is_active = input.is_active;

        let user = self
            .insert_with_role(new_user, input.role.unwrap_or_default())
            .await?;

        self.activity
            .record_for(
                ctx,
                actions::USER_CREATED,
                Some(format!("{} ({})", user.email, user.role)),
            )
            .await;

        Ok(user)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(
        &self,
        input: LoginInput,
        ctx: &AuditContext,
    ) -> Result<(User, Session), UserServiceError> {
        let email = normalize_email(&input.email);

        let user = match self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => {
                self.record_failed_login(None, &email, ctx).await;
                return Err(UserServiceError::AuthenticationError(
                    INVALID_CREDENTIALS.to_string(),
                ));
            }
        };

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            self.record_failed_login(Some(user.id), &email, ctx).await;
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        if !user.is_active {
            self.record_failed_login(Some(user.id), &email, ctx).await;
            return Err(UserServiceError::AuthenticationError(
                "Account is disabled".to_string(),
            ));
        }

        let session = self.create_session(user.id).await?;

        let ctx = AuditContext::new(Some(user.id), ctx.ip_address.clone());
        self.activity.record_for(&ctx, actions::USER_LOGIN, None).await;

        Ok((user, session))
    }

    /// Delete the session; unknown tokens are not an error
    pub async fn logout(&self, token: &str, ctx: &AuditContext) -> Result<(), UserServiceError> {
        let session = self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?;

        self.session_repo
            .delete_by_token(token)
            .await
            .context("Failed to delete session")?;

        if let Some(session) = session {
            let ctx = AuditContext::new(Some(session.user_id), ctx.ip_address.clone());
            self.activity.record_for(&ctx, actions::USER_LOGOUT, None).await;
        }

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown or expired tokens and for disabled accounts.
    /// Expired sessions are removed on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete_by_token(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(|u| u.is_active))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_email(&normalize_email(email))
            .await
            .context("Failed to get user by email")?)
    }

    /// Role column and extension-table memberships for a user
    pub async fn role_profile(&self, id: i64) -> Result<RoleProfile, UserServiceError> {
        self.role_repo
            .profile(id)
            .await
            .context("Failed to load role profile")?
            .ok_or(UserServiceError::NotFound)
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params)
            .await
            .context("Failed to list users")?;

        Ok(PagedResult::new(users, total, params))
    }

    /// Apply a partial update. A role change goes through role assignment.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateUserInput,
        ctx: &AuditContext,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get_by_id(id).await?.ok_or(UserServiceError::NotFound)?;

        if let Some(email) = input.email {
            let email = normalize_email(&email);
            validate_email(&email)?;
            if email != user.email {
                self.ensure_email_free(&email).await?;
                user.email = email;
            }
        }
        if let Some(password) = input.password {
            check_password_policy(&password).map_err(UserServiceError::ValidationError)?;
            user.password_hash = hash_password(&password).context("Failed to hash password")?;
        }
        if let Some(first_name) = input.first_name {
            validate_name(first_name.as_deref())?;
            user.first_name = trim_name(first_name);
        }
        if let Some(last_name) = input.last_name {
            validate_name(last_name.as_deref())?;
            user.last_name = trim_name(last_name);
        }
        let deactivated = user.is_active && input.is_active == Some(false);
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }

        let role_change = input.role.filter(|role| *role != user.role);

        let mut updated = self
            .user_repo
            .update(&user)
            .await
            .map_err(|e| map_write_error(e, &user.email))?;

        if let Some(role) = role_change {
            updated = self.assign_role(id, role, ctx).await?;
        }

        if deactivated {
            let revoked = self
                .session_repo
                .delete_by_user(id)
                .await
                .context("Failed to revoke sessions")?;
            tracing::info!(user_id = id, revoked, "User deactivated");
        }

        self.activity
            .record_for(ctx, actions::USER_UPDATED, Some(updated.email.clone()))
            .await;

        Ok(updated)
    }

    /// Delete an account. Sessions and role rows go with it; activity entries
    /// stay, detached from the user.
    pub async fn delete(&self, id: i64, ctx: &AuditContext) -> Result<(), UserServiceError> {
        if ctx.actor_id == Some(id) {
            return Err(UserServiceError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        let user = self.get_by_id(id).await?.ok_or(UserServiceError::NotFound)?;

        let deleted = self
            .user_repo
            .delete(id)
            .await
            .context("Failed to delete user")?;
        if !deleted {
            return Err(UserServiceError::NotFound);
        }

        self.activity
            .record_for(ctx, actions::USER_DELETED, Some(user.email))
            .await;

        Ok(())
    }

    /// Set a user's role and move their extension row to the matching table
    pub async fn assign_role(
        &self,
        id: i64,
        role: UserRole,
        ctx: &AuditContext,
    ) -> Result<User, UserServiceError> {
        let found = self
            .role_repo
            .assign(id, role)
            .await
            .context("Failed to assign role")?;
        if !found {
            return Err(UserServiceError::NotFound);
        }

        self.activity
            .record_for(ctx, actions::ROLE_ASSIGNED, Some(format!("user {} -> {}", id, role)))
            .await;

        self.get_by_id(id).await?.ok_or(UserServiceError::NotFound)
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;

        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired(Utc::now())
            .await
            .context("Failed to delete expired sessions")?)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn ensure_email_free(&self, email: &str) -> Result<(), UserServiceError> {
        if self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }
        Ok(())
    }

    /// Insert the user and its role row in one transaction
    async fn insert_with_role(
        &self,
        new_user: NewUser,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        let new_user = new_user.with_role(role);
        self.user_repo
            .create(&new_user)
            .await
            .map_err(|e| map_write_error(e, &new_user.email))
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = NewSession {
            user_id,
            token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + self.session_ttl,
        };

        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }

    async fn record_failed_login(&self, user_id: Option<i64>, email: &str, ctx: &AuditContext) {
        let ctx = AuditContext::new(user_id, ctx.ip_address.clone());
        self.activity
            .record_for(&ctx, actions::USER_LOGIN_FAILED, Some(email.to_string()))
            .await;
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Email cannot be empty".to_string(),
        ));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_LENGTH
        )));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(name: Option<&str>) -> Result<(), UserServiceError> {
    if let Some(name) = name {
        if name.trim().chars().count() > MAX_NAME_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "Names must be at most {} characters",
                MAX_NAME_LENGTH
            )));
        }
    }
    Ok(())
}

/// Trim, treating blank as absent
fn trim_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// A unique-constraint failure on insert/update is a duplicate email
fn map_write_error(err: anyhow::Error, email: &str) -> UserServiceError {
    let duplicate = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false);

    if duplicate {
        UserServiceError::UserExists(format!("Email '{}' is already registered", email))
    } else {
        UserServiceError::InternalError(err)
    }
}
