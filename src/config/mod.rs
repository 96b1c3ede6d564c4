//! Configuration management
//!
//! This module handles loading and parsing configuration for the discussion board.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

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
    /// Token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Board business rules
    #[serde(default)]
    pub board: BoardConfig,
    /// Outgoing mail (optional)
    #[serde(default)]
    pub email: EmailConfig,
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
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Take client addresses from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a reverse proxy that overwrites those headers.
    #[serde(default)]
    pub trusted_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            trusted_proxy: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
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
    "data/discussboard.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Access/refresh token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Lifetime of access tokens in minutes
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    /// Lifetime of refresh tokens in days
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
        }
    }
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_access_token_minutes() -> i64 {
    60
}

fn default_refresh_token_days() -> i64 {
    14
}

/// Board business rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Minutes after creation during which an author may delete a comment
    #[serde(default = "default_comment_delete_window_minutes")]
    pub comment_delete_window_minutes: i64,
    /// Deepest allowed reply level (top-level comments are depth 0)
    #[serde(default = "default_max_comment_depth")]
    pub max_comment_depth: i64,
    #[serde(default = "default_comment_min_length")]
    pub comment_min_length: usize,
    #[serde(default = "default_comment_max_length")]
    pub comment_max_length: usize,
    #[serde(default = "default_post_title_max_length")]
    pub post_title_max_length: usize,
    #[serde(default = "default_post_body_max_length")]
    pub post_body_max_length: usize,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            comment_delete_window_minutes: default_comment_delete_window_minutes(),
            max_comment_depth: default_max_comment_depth(),
            comment_min_length: default_comment_min_length(),
            comment_max_length: default_comment_max_length(),
            post_title_max_length: default_post_title_max_length(),
            post_body_max_length: default_post_body_max_length(),
            password_min_length: default_password_min_length(),
        }
    }
}

fn default_comment_delete_window_minutes() -> i64 {
    15
}

fn default_max_comment_depth() -> i64 {
    3
}

fn default_comment_min_length() -> usize {
    1
}

fn default_comment_max_length() -> usize {
    2000
}

fn default_post_title_max_length() -> usize {
    200
}

fn default_post_body_max_length() -> usize {
    20000
}

fn default_password_min_length() -> usize {
    8
}

/// SMTP configuration. Mail is only sent when `smtp_host` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    /// Whether enough is configured to attempt delivery
    pub fn is_configured(&self) -> bool {
        self.smtp_host.as_deref().is_some_and(|h| !h.trim().is_empty()) && self.from.is_some()
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
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
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

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - DISCUSSBOARD_SERVER_HOST
    /// - DISCUSSBOARD_SERVER_PORT
    /// - DISCUSSBOARD_SERVER_CORS_ORIGIN
    /// - DISCUSSBOARD_SERVER_TRUSTED_PROXY
    /// - DISCUSSBOARD_DATABASE_URL
    /// - DISCUSSBOARD_DATABASE_MAX_CONNECTIONS
    /// - DISCUSSBOARD_AUTH_JWT_SECRET
    /// - DISCUSSBOARD_AUTH_ACCESS_TOKEN_MINUTES
    /// - DISCUSSBOARD_AUTH_REFRESH_TOKEN_DAYS
    /// - DISCUSSBOARD_BOARD_COMMENT_DELETE_WINDOW_MINUTES
    /// - DISCUSSBOARD_BOARD_MAX_COMMENT_DEPTH
    /// - DISCUSSBOARD_BOARD_{COMMENT_MIN,COMMENT_MAX,POST_TITLE_MAX,POST_BODY_MAX}_LENGTH
    /// - DISCUSSBOARD_BOARD_PASSWORD_MIN_LENGTH
    /// - DISCUSSBOARD_EMAIL_SMTP_HOST
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values no deployment can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError("auth.jwt_secret must not be empty".into()));
        }
        check_range(
            "auth.access_token_minutes",
            self.auth.access_token_minutes,
            1,
            MAX_ACCESS_TOKEN_MINUTES,
        )?;
        check_range(
            "auth.refresh_token_days",
            self.auth.refresh_token_days,
            1,
            MAX_REFRESH_TOKEN_DAYS,
        )?;
        check_range(
            "board.comment_delete_window_minutes",
            self.board.comment_delete_window_minutes,
            1,
            MAX_DELETE_WINDOW_MINUTES,
        )?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.board.comment_max_length == 0
            || self.board.post_title_max_length == 0
            || self.board.post_body_max_length == 0
        {
            return Err(ConfigError::ValidationError(
                "board length limits must be positive".into(),
            ));
        }
        if self.board.comment_min_length > self.board.comment_max_length {
            return Err(ConfigError::ValidationError(
                "board.comment_min_length exceeds board.comment_max_length".into(),
            ));
        }
        if self.board.max_comment_depth < 0 {
            return Err(ConfigError::ValidationError("board.max_comment_depth must be >= 0".into()));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DISCUSSBOARD_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DISCUSSBOARD_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("DISCUSSBOARD_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Some(trusted) = env_parse::<bool>("DISCUSSBOARD_SERVER_TRUSTED_PROXY") {
            self.server.trusted_proxy = trusted;
        }

        if let Ok(url) = std::env::var("DISCUSSBOARD_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = env_parse::<u32>("DISCUSSBOARD_DATABASE_MAX_CONNECTIONS") {
            if max > 0 {
                self.database.max_connections = max;
            }
        }

        if let Ok(secret) = std::env::var("DISCUSSBOARD_AUTH_JWT_SECRET") {
            if !secret.is_empty() {
                self.auth.jwt_secret = secret;
            }
        }
        if let Ok(minutes) = std::env::var("DISCUSSBOARD_AUTH_ACCESS_TOKEN_MINUTES") {
            if let Ok(minutes) = minutes.parse::<i64>() {
                if minutes > 0 {
                    self.auth.access_token_minutes = minutes;
                }
            }
        }
        if let Ok(days) = std::env::var("DISCUSSBOARD_AUTH_REFRESH_TOKEN_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                if days > 0 {
                    self.auth.refresh_token_days = days;
                }
            }
        }

        if let Ok(window) = std::env::var("DISCUSSBOARD_BOARD_COMMENT_DELETE_WINDOW_MINUTES") {
            if let Ok(window) = window.parse::<i64>() {
                if window > 0 {
                    self.board.comment_delete_window_minutes = window;
                }
            }
        }
        if let Ok(depth) = std::env::var("DISCUSSBOARD_BOARD_MAX_COMMENT_DEPTH") {
            if let Ok(depth) = depth.parse::<i64>() {
                if depth >= 0 {
                    self.board.max_comment_depth = depth;
                }
            }
        }

        let limits = [
            ("DISCUSSBOARD_BOARD_COMMENT_MIN_LENGTH", &mut self.board.comment_min_length),
            ("DISCUSSBOARD_BOARD_COMMENT_MAX_LENGTH", &mut self.board.comment_max_length),
            ("DISCUSSBOARD_BOARD_POST_TITLE_MAX_LENGTH", &mut self.board.post_title_max_length),
            ("DISCUSSBOARD_BOARD_POST_BODY_MAX_LENGTH", &mut self.board.post_body_max_length),
            ("DISCUSSBOARD_BOARD_PASSWORD_MIN_LENGTH", &mut self.board.password_min_length),
        ];
        for (name, field) in limits {
            if let Some(value) = env_parse::<usize>(name) {
                *field = value;
            }
        }

        if let Ok(host) = std::env::var("DISCUSSBOARD_EMAIL_SMTP_HOST") {
            self.email.smtp_host = Some(host);
        }
    }
}

/// One year
pub const MAX_DELETE_WINDOW_MINUTES: i64 = 525_600;
/// Thirty days
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 43_200;
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Parse an environment variable, ignoring it when unset or malformed
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
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

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "DISCUSSBOARD_SERVER_HOST",
    "DISCUSSBOARD_SERVER_PORT",
    "DISCUSSBOARD_SERVER_CORS_ORIGIN",
    "DISCUSSBOARD_SERVER_TRUSTED_PROXY",
    "DISCUSSBOARD_DATABASE_URL",
    "DISCUSSBOARD_DATABASE_MAX_CONNECTIONS",
    "DISCUSSBOARD_AUTH_JWT_SECRET",
    "DISCUSSBOARD_AUTH_ACCESS_TOKEN_MINUTES",
    "DISCUSSBOARD_AUTH_REFRESH_TOKEN_DAYS",
    "DISCUSSBOARD_BOARD_COMMENT_DELETE_WINDOW_MINUTES",
    "DISCUSSBOARD_BOARD_MAX_COMMENT_DEPTH",
    "DISCUSSBOARD_BOARD_COMMENT_MIN_LENGTH",
    "DISCUSSBOARD_BOARD_COMMENT_MAX_LENGTH",
    "DISCUSSBOARD_BOARD_POST_TITLE_MAX_LENGTH",
    "DISCUSSBOARD_BOARD_POST_BODY_MAX_LENGTH",
    "DISCUSSBOARD_BOARD_PASSWORD_MIN_LENGTH",
    "DISCUSSBOARD_EMAIL_SMTP_HOST",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for key in super::ENV_KEYS {
            std::env::remove_var(key);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/discussboard.db");
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.auth.refresh_token_days, 14);
        assert_eq!(config.board.comment_delete_window_minutes, 15);
        assert_eq!(config.board.max_comment_depth, 3);
        assert!(!config.email.is_configured());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.board.comment_max_length, 2000);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "board:\n  max_comment_depth: 5\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.board.max_comment_depth, 5);
        assert_eq!(config.board.comment_delete_window_minutes, 15);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  url: "board.db"
  max_connections: 4
auth:
  jwt_secret: "s3cret"
  access_token_minutes: 5
  refresh_token_days: 30
board:
  comment_delete_window_minutes: 30
  comment_max_length: 500
email:
  smtp_host: "smtp.example.com"
  from: "board@example.com"
"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "board.db");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.access_token_minutes, 5);
        assert_eq!(config.auth.refresh_token_days, 30);
        assert_eq!(config.board.comment_delete_window_minutes, 30);
        assert_eq!(config.board.comment_max_length, 500);
        assert_eq!(config.email.smtp_port, 587);
        assert!(config.email.is_configured());
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_load_rejects_inverted_comment_bounds() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "board:\n  comment_min_length: 50\n  comment_max_length: 10\n").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_rejects_out_of_range_windows() {
        for yaml in [
            "board:\n  comment_delete_window_minutes: 1000000000000000\n",
            "board:\n  comment_delete_window_minutes: 0\n",
            "board:\n  comment_delete_window_minutes: -5\n",
            "auth:\n  access_token_minutes: 1000000000000000\n",
            "auth:\n  refresh_token_days: 100000000000\n",
            "database:\n  max_connections: 0\n",
            "board:\n  post_title_max_length: 0\n",
        ] {
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();
            let err = Config::load(file.path()).unwrap_err();
            assert!(err.to_string().contains("must be"), "{}: {}", yaml.trim(), err);
        }

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "board:\n  comment_delete_window_minutes: 525600\n").unwrap();
        assert!(Config::load(file.path()).is_ok());
    }

    #[test]
    fn test_env_override_server_and_auth() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("DISCUSSBOARD_SERVER_HOST", "192.168.1.1");
        std::env::set_var("DISCUSSBOARD_SERVER_PORT", "4000");
        std::env::set_var("DISCUSSBOARD_AUTH_JWT_SECRET", "from-env");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.jwt_secret, "from-env");

        for key in super::ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_board_rules() {
        let _guard = lock_env();

        let file = NamedTempFile::new().unwrap();
        std::env::set_var("DISCUSSBOARD_BOARD_COMMENT_DELETE_WINDOW_MINUTES", "45");
        std::env::set_var("DISCUSSBOARD_BOARD_MAX_COMMENT_DEPTH", "1");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.board.comment_delete_window_minutes, 45);
        assert_eq!(config.board.max_comment_depth, 1);

        for key in super::ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_limits_and_pool() {
        let _guard = lock_env();

        let file = NamedTempFile::new().unwrap();
        std::env::set_var("DISCUSSBOARD_DATABASE_MAX_CONNECTIONS", "7");
        std::env::set_var("DISCUSSBOARD_BOARD_COMMENT_MIN_LENGTH", "3");
        std::env::set_var("DISCUSSBOARD_BOARD_COMMENT_MAX_LENGTH", "300");
        std::env::set_var("DISCUSSBOARD_BOARD_POST_TITLE_MAX_LENGTH", "80");
        std::env::set_var("DISCUSSBOARD_BOARD_POST_BODY_MAX_LENGTH", "9000");
        std::env::set_var("DISCUSSBOARD_BOARD_PASSWORD_MIN_LENGTH", "12");
        std::env::set_var("DISCUSSBOARD_SERVER_TRUSTED_PROXY", "true");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.database.max_connections, 7);
        assert_eq!(config.board.comment_min_length, 3);
        assert_eq!(config.board.comment_max_length, 300);
        assert_eq!(config.board.post_title_max_length, 80);
        assert_eq!(config.board.post_body_max_length, 9000);
        assert_eq!(config.board.password_min_length, 12);
        assert!(config.server.trusted_proxy);

        for key in super::ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_cannot_break_windows() {
        let _guard = lock_env();

        let file = NamedTempFile::new().unwrap();
        std::env::set_var("DISCUSSBOARD_BOARD_COMMENT_DELETE_WINDOW_MINUTES", "-10");
        let config = Config::load_with_env(file.path()).unwrap();
        assert_eq!(config.board.comment_delete_window_minutes, 15);

        std::env::set_var(
            "DISCUSSBOARD_BOARD_COMMENT_DELETE_WINDOW_MINUTES",
            "1000000000000000",
        );
        assert!(Config::load_with_env(file.path()).is_err());

        for key in super::ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();

        let file = NamedTempFile::new().unwrap();
        std::env::set_var("DISCUSSBOARD_SERVER_PORT", "not_a_port");
        std::env::set_var("DISCUSSBOARD_AUTH_ACCESS_TOKEN_MINUTES", "-3");
        std::env::set_var("DISCUSSBOARD_BOARD_MAX_COMMENT_DEPTH", "-1");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.board.max_comment_depth, 3);

        for key in super::ENV_KEYS {
            std::env::remove_var(key);
        }
    }
}
