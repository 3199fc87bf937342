//! HTTP client for the admin API
//!
//! [`ApiClient`] is built explicitly from a base URL and passed by reference.
//! It keeps cookies between calls, so a successful [`ApiClient::login`]
//! authenticates every later request.

pub mod endpoints;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::auth::{LoginRequest, RegisterRequest};
use crate::api::responses::{
    ActivityResponse, AuthResponse, GrowthResponse, HealthResponse, MessageResponse,
    StatsResponse, UserDetailResponse, UserEnvelope, UserListResponse, UserResponse,
};
use crate::api::users::{CreateUserRequest, UpdateUserRequest};
use crate::models::ActivityWithUser;
use crate::services::{DashboardStats, MonthlyCount};

/// Message used when an error response carries none
pub const DEFAULT_ERROR_MESSAGE: &str = "Request failed";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status
    #[error("{message} (HTTP {status})")]
    Api { status: StatusCode, message: String },

    /// Transport failure or unreadable response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Status code of an API error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Client for the server at `base_url` (e.g. `http://localhost:3001`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Use a preconfigured reqwest client; it should have a cookie store
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        self.request(Method::POST, path, body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        self.request(Method::PUT, path, body).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        self.request(Method::PATCH, path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!(method = %method, url = %url, "api request");

        let mut builder = self
            .http
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status,
                message: error_message(&text),
            });
        }

        // Empty bodies (204) decode as JSON null, which fits `()` and `Option`
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    // ------------------------------------------------------------------
    // Page flows
    // ------------------------------------------------------------------

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.post(endpoints::AUTH_REGISTER, Some(request)).await
    }

    /// Log in; the session cookie is kept for later calls
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post(endpoints::AUTH_LOGIN, Some(&body)).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.post::<(), ()>(endpoints::AUTH_LOGOUT, None).await
    }

    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        let envelope: UserEnvelope = self.get(endpoints::AUTH_ME).await?;
        Ok(envelope.user)
    }

    pub async fn list_users(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<UserListResponse, ClientError> {
        self.get(&endpoints::users_page(page, limit, search)).await
    }

    pub async fn get_user(&self, id: i64) -> Result<UserDetailResponse, ClientError> {
        self.get(&endpoints::user(id)).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserResponse, ClientError> {
        let envelope: UserEnvelope = self.post(endpoints::USERS, Some(request)).await?;
        Ok(envelope.user)
    }

    pub async fn update_user(
        &self,
        id: i64,
        request: &UpdateUserRequest,
    ) -> Result<UserResponse, ClientError> {
        let envelope: UserEnvelope = self.put(&endpoints::user(id), Some(request)).await?;
        Ok(envelope.user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<MessageResponse, ClientError> {
        self.delete(&endpoints::user(id)).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        let response: StatsResponse = self.get(endpoints::DASHBOARD_STATS).await?;
        Ok(response.stats)
    }

    /// Most recent activity; `None` asks for the default five entries
    pub async fn recent_activity(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityWithUser>, ClientError> {
        let response: ActivityResponse = self.get(&endpoints::recent_activity(limit)).await?;
        Ok(response.activity)
    }

    pub async fn user_growth(&self) -> Result<Vec<MonthlyCount>, ClientError> {
        let response: GrowthResponse = self.get(endpoints::DASHBOARD_USER_GROWTH).await?;
        Ok(response.growth)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get(endpoints::HEALTH).await
    }
}

/// The `message` field of an error body, or the generic fallback
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}
