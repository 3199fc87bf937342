//! Activity service
//!
//! Writes to the audit trail never fail the operation that produced them:
//! a failed append is logged and dropped.

use crate::db::repositories::ActivityRepository;
use crate::models::{ActivityWithUser, NewActivity};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Who triggered an operation, for the activity log
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub actor_id: Option<i64>,
    pub ip_address: Option<String>,
}

impl AuditContext {
    pub fn new(actor_id: Option<i64>, ip_address: Option<String>) -> Self {
        Self {
            actor_id,
            ip_address,
        }
    }

    /// No actor and no origin, as used for startup tasks
    pub fn system() -> Self {
        Self::default()
    }
}

pub struct ActivityService {
    repo: Arc<dyn ActivityRepository>,
}

impl ActivityService {
    pub fn new(repo: Arc<dyn ActivityRepository>) -> Self {
        Self { repo }
    }

    /// Append an entry; errors are logged at warn and swallowed
    pub async fn record(&self, activity: NewActivity) {
        if let Err(e) = self.repo.append(&activity).await {
            tracing::warn!(action = %activity.action, "Failed to record activity: {:#}", e);
        }
    }

    /// Append an entry attributed to the context's actor and origin
    pub async fn record_for(&self, ctx: &AuditContext, action: &str, details: Option<String>) {
        let mut activity = NewActivity::new(action).ip(ctx.ip_address.clone());
        activity.user_id = ctx.actor_id;
        activity.details = details;
        self.record(activity).await;
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityWithUser>> {
        self.repo
            .recent(limit)
            .await
            .context("Failed to load recent activity")
    }
}
