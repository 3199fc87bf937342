//! Activity log model
//!
//! The activity log is append-only. Entries with no user are system events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known action labels
pub mod actions {
    pub const USER_REGISTERED: &str = "user.registered";
    pub const USER_LOGIN: &str = "user.login";
    pub const USER_LOGIN_FAILED: &str = "user.login_failed";
    pub const USER_LOGOUT: &str = "user.logout";
    pub const USER_CREATED: &str = "user.created";
    pub const USER_UPDATED: &str = "user.updated";
    pub const USER_DELETED: &str = "user.deleted";
    pub const ROLE_ASSIGNED: &str = "user.role_assigned";
    pub const SYSTEM_BOOTSTRAP: &str = "system.bootstrap";
}

/// One activity log row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for a new activity row
#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl NewActivity {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

/// The user fields shown next to an activity entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUser {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// An activity entry joined with its (optional) user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWithUser {
    #[serde(flatten)]
    pub entry: ActivityLog,
    pub user: Option<ActivityUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_activity_builder() {
        let activity = NewActivity::new(actions::USER_LOGIN)
            .user(7)
            .details("from dashboard")
            .ip(Some("10.0.0.1".to_string()));

        assert_eq!(activity.action, "user.login");
        assert_eq!(activity.user_id, Some(7));
        assert_eq!(activity.details.as_deref(), Some("from dashboard"));
        assert_eq!(activity.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_activity_with_user_serializes_flat() {
        let item = ActivityWithUser {
            entry: ActivityLog {
                id: 3,
                user_id: None,
                action: "system.bootstrap".to_string(),
                details: None,
                ip_address: None,
                created_at: Utc::now(),
            },
            user: None,
        };

        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["action"], "system.bootstrap");
        assert!(json["user"].is_null());
        assert!(json.get("createdAt").is_some());
    }
}
