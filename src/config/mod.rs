//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file and then overridden by
//! `ADMINDASH_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session and cookie configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Initial admin account
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the dashboard's address, cookies are sent cross-origin)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/admindash.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Add the `Secure` attribute to the session cookie
    #[serde(default)]
    pub secure_cookies: bool,
    /// Interval between expired-session sweeps
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookies: false,
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl AuthConfig {
    /// Session lifetime in hours, forced into `1..=MAX_SESSION_TTL_HOURS`
    pub fn effective_session_ttl_hours(&self) -> i64 {
        self.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS)
    }

    /// `Max-Age` of the session cookie in seconds
    pub fn session_max_age_secs(&self) -> i64 {
        self.effective_session_ttl_hours() * 60 * 60
    }
}

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

fn default_session_ttl_hours() -> i64 {
    7 * 24
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

/// Initial admin account, created only while the users table is empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl BootstrapConfig {
    /// Both credentials, when configured
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (self.admin_email.as_deref(), self.admin_password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults; invalid YAML is an error
    /// that names the offending line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognized variables:
    /// - ADMINDASH_SERVER_HOST / ADMINDASH_SERVER_PORT / ADMINDASH_SERVER_CORS_ORIGIN
    /// - ADMINDASH_DATABASE_URL / ADMINDASH_DATABASE_MAX_CONNECTIONS
    /// - ADMINDASH_AUTH_SESSION_TTL_HOURS / ADMINDASH_AUTH_SECURE_COOKIES
    /// - ADMINDASH_AUTH_CLEANUP_INTERVAL_SECS
    /// - ADMINDASH_BOOTSTRAP_ADMIN_EMAIL / ADMINDASH_BOOTSTRAP_ADMIN_PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ttl = self.auth.session_ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
            return Err(ConfigError::InvalidValue {
                field: "auth.session_ttl_hours",
                message: format!("{} is outside 1..={}", ttl, MAX_SESSION_TTL_HOURS),
            });
        }
        if self.auth.cleanup_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.cleanup_interval_secs",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ADMINDASH_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ADMINDASH_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("ADMINDASH_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("ADMINDASH_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("ADMINDASH_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = max;
            }
        }

        if let Ok(ttl) = std::env::var("ADMINDASH_AUTH_SESSION_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.session_ttl_hours = ttl;
            }
        }
        if let Ok(interval) = std::env::var("ADMINDASH_AUTH_CLEANUP_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse::<u64>() {
                self.auth.cleanup_interval_secs = interval;
            }
        }
        if let Ok(secure) = std::env::var("ADMINDASH_AUTH_SECURE_COOKIES") {
            match secure.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.auth.secure_cookies = true,
                "0" | "false" | "no" => self.auth.secure_cookies = false,
                _ => {}
            }
        }

        if let Ok(email) = std::env::var("ADMINDASH_BOOTSTRAP_ADMIN_EMAIL") {
            self.bootstrap.admin_email = Some(email);
        }
        if let Ok(password) = std::env::var("ADMINDASH_BOOTSTRAP_ADMIN_PASSWORD") {
            self.bootstrap.admin_password = Some(password);
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_admindash_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.cors_origin, "http://localhost:5173");
        assert_eq!(config.database.url, "data/admindash.db");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.session_ttl_hours, 168);
        assert!(!config.auth.secure_cookies);
        assert!(config.bootstrap.admin_credentials().is_none());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 4000\nauth:\n  session_ttl_hours: 2\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.session_ttl_hours, 2);
        assert_eq!(config.auth.cleanup_interval_secs, 300);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://admin.example.com"
database:
  url: ":memory:"
  max_connections: 2
auth:
  session_ttl_hours: 12
  secure_cookies: true
  cleanup_interval_secs: 60
bootstrap:
  admin_email: "root@example.com"
  admin_password: "change-me"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.server.cors_origin, "https://admin.example.com");
        assert_eq!(config.database.url, ":memory:");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.auth.session_ttl_hours, 12);
        assert!(config.auth.secure_cookies);
        assert_eq!(config.auth.cleanup_interval_secs, 60);
        assert_eq!(
            config.bootstrap.admin_credentials(),
            Some(("root@example.com", "change-me"))
        );
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();

        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_bootstrap_requires_both_credentials() {
        let bootstrap = BootstrapConfig {
            admin_email: Some("root@example.com".to_string()),
            admin_password: None,
        };
        assert!(bootstrap.admin_credentials().is_none());

        let bootstrap = BootstrapConfig {
            admin_email: Some(String::new()),
            admin_password: Some("secret".to_string()),
        };
        assert!(bootstrap.admin_credentials().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();

        std::env::set_var("ADMINDASH_SERVER_PORT", "8123");
        std::env::set_var("ADMINDASH_DATABASE_URL", "/tmp/other.db");
        std::env::set_var("ADMINDASH_AUTH_SECURE_COOKIES", "true");
        std::env::set_var("ADMINDASH_BOOTSTRAP_ADMIN_EMAIL", "env@example.com");
        std::env::set_var("ADMINDASH_BOOTSTRAP_ADMIN_PASSWORD", "env-secret");

        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_admindash_config.yml"))
                .unwrap();

        std::env::remove_var("ADMINDASH_SERVER_PORT");
        std::env::remove_var("ADMINDASH_DATABASE_URL");
        std::env::remove_var("ADMINDASH_AUTH_SECURE_COOKIES");
        std::env::remove_var("ADMINDASH_BOOTSTRAP_ADMIN_EMAIL");
        std::env::remove_var("ADMINDASH_BOOTSTRAP_ADMIN_PASSWORD");

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.database.url, "/tmp/other.db");
        assert!(config.auth.secure_cookies);
        assert_eq!(
            config.bootstrap.admin_credentials(),
            Some(("env@example.com", "env-secret"))
        );
    }

    #[test]
    fn test_out_of_range_session_ttl_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "auth:\n  session_ttl_hours: 9223372036854775\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("auth.session_ttl_hours"));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "auth:\n  session_ttl_hours: 0\n").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_session_ttl_helpers_clamp() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.session_max_age_secs(), 168 * 3600);

        auth.session_ttl_hours = i64::MAX / 1000;
        assert_eq!(auth.effective_session_ttl_hours(), MAX_SESSION_TTL_HOURS);
        assert_eq!(auth.session_max_age_secs(), MAX_SESSION_TTL_HOURS * 3600);

        auth.session_ttl_hours = -5;
        assert_eq!(auth.effective_session_ttl_hours(), 1);
    }

    #[test]
    fn test_env_session_ttl_is_validated() {
        let _guard = lock_env();

        std::env::set_var("ADMINDASH_AUTH_SESSION_TTL_HOURS", "99999999999");
        let result =
            Config::load_with_env(std::path::Path::new("nonexistent_admindash_config.yml"));
        std::env::remove_var("ADMINDASH_AUTH_SESSION_TTL_HOURS");

        assert!(result.is_err());
    }

    #[test]
    fn test_env_cleanup_interval_override() {
        let _guard = lock_env();

        std::env::set_var("ADMINDASH_AUTH_CLEANUP_INTERVAL_SECS", "45");
        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_admindash_config.yml"))
                .unwrap();
        std::env::remove_var("ADMINDASH_AUTH_CLEANUP_INTERVAL_SECS");

        assert_eq!(config.auth.cleanup_interval_secs, 45);
    }

    #[test]
    fn test_env_override_ignores_invalid_port() {
        let _guard = lock_env();

        std::env::set_var("ADMINDASH_SERVER_PORT", "not-a-port");
        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_admindash_config.yml"))
                .unwrap();
        std::env::remove_var("ADMINDASH_SERVER_PORT");

        assert_eq!(config.server.port, 3001);
    }
}
