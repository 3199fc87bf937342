//! Dashboard service
//!
//! Aggregates for the dashboard landing page.

use crate::db::repositories::UserRepository;
use crate::models::{ActivityWithUser, UserRole};
use crate::services::activity::ActivityService;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default and maximum number of recent activity entries
pub const DEFAULT_RECENT_ACTIVITY: i64 = 5;
pub const MAX_RECENT_ACTIVITY: i64 = 50;

/// Months covered by the growth chart, including the current one
pub const GROWTH_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users_this_month: i64,
    pub total_admins: i64,
}

/// Signups in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
}

pub struct DashboardService {
    user_repo: Arc<dyn UserRepository>,
    activity: Arc<ActivityService>,
}

impl DashboardService {
    pub fn new(user_repo: Arc<dyn UserRepository>, activity: Arc<ActivityService>) -> Self {
        Self {
            user_repo,
            activity,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        self.stats_at(Utc::now()).await
    }

    async fn stats_at(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let month_start = month_start(now.date_naive());

        Ok(DashboardStats {
            total_users: self.user_repo.count().await.context("Failed to count users")?,
            active_users: self.user_repo.count_active().await?,
            new_users_this_month: self.user_repo.count_created_since(midnight(month_start)).await?,
            total_admins: self.user_repo.count_by_role(UserRole::Admin).await?,
        })
    }

    /// Newest entries first; `limit` is clamped to 1..=50
    pub async fn recent_activity(&self, limit: Option<i64>) -> Result<Vec<ActivityWithUser>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_ACTIVITY)
            .clamp(1, MAX_RECENT_ACTIVITY);
        self.activity.recent(limit).await
    }

    /// Signups per month for the last [`GROWTH_MONTHS`] months, oldest first.
    /// Months without signups are reported with a zero count.
    pub async fn user_growth(&self) -> Result<Vec<MonthlyCount>> {
        let months = month_range(Utc::now().date_naive(), GROWTH_MONTHS);
        let Some(first) = months.first() else {
            return Ok(Vec::new());
        };

        let counts = self
            .user_repo
            .monthly_signups(midnight(*first))
            .await
            .context("Failed to load user growth")?;

        Ok(months
            .iter()
            .map(|start| {
                let month = start.format("%Y-%m").to_string();
                let count = counts
                    .iter()
                    .find(|(m, _)| *m == month)
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                MonthlyCount { month, count }
            })
            .collect())
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// First days of the `count` months ending with the month of `today`, ascending
fn month_range(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let current = month_start(today);
    (0..count)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}
