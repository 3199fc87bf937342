//! Endpoint paths, relative to `/api/v1`

pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";
pub const USERS: &str = "/users";
pub const DASHBOARD_STATS: &str = "/dashboard/stats";
pub const DASHBOARD_USER_GROWTH: &str = "/dashboard/user-growth";
pub const HEALTH: &str = "/health";

/// Number of activity entries the dashboard asks for by default
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 5;

pub fn user(id: i64) -> String {
    format!("{}/{}", USERS, id)
}

/// `/users?page=..&limit=..[&search=..]`
pub fn users_page(page: u32, limit: u32, search: Option<&str>) -> String {
    let mut path = format!("{}?page={}&limit={}", USERS, page, limit);
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        path.push_str("&search=");
        path.push_str(&urlencoding::encode(search));
    }
    path
}

pub fn recent_activity(limit: Option<i64>) -> String {
    format!(
        "/dashboard/recent-activity?limit={}",
        limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT)
    )
}
