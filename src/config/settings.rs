//! Application settings loaded from a TOML file.
//!
//! The file location comes from `STUDIO_CONFIG` (default `config.toml`). Every
//! section is optional; a missing file means all defaults.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration structure representing the entire config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// How requests are tied to an account
    pub auth: AuthConfig,
    /// Schedule defaults
    pub schedule: ScheduleConfig,
    /// Subscription plans seeded on start-up
    pub plans: Vec<PlanConfig>,
    /// Optional staff account created on start-up
    pub admin: Option<AdminConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8000`
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Identity propagation from the upstream auth proxy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the authenticated account id
    pub account_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            account_header: "x-account-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Admin views list birthdays at most this many days ahead
    pub birthday_window_days: i64,
    /// Duration used when a session form leaves it empty
    pub default_duration_minutes: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            birthday_window_days: 3,
            default_duration_minutes: 60,
        }
    }
}

/// One plan to seed
#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    pub name: String,
    pub lessons_count: i32,
    pub price: f64,
}

/// Bootstrap staff account
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses settings from TOML text
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config: {e}"),
    })
}

/// Loads settings from `STUDIO_CONFIG` (or `./config.toml`), falling back to
/// defaults when the file does not exist.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("STUDIO_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(&path)
    } else {
        warn!("Config file {} not found, using defaults", path);
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind = "0.0.0.0:9000"

            [auth]
            account_header = "x-remote-user"

            [schedule]
            birthday_window_days = 7

            [[plans]]
            name = "Basic"
            lessons_count = 8
            price = 4000.0

            [[plans]]
            name = "Intensive"
            lessons_count = 12
            price = 5500.0

            [admin]
            username = "owner"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.auth.account_header, "x-remote-user");
        assert_eq!(config.schedule.birthday_window_days, 7);
        assert_eq!(config.schedule.default_duration_minutes, 60);
        assert_eq!(config.plans.len(), 2);
        assert_eq!(config.plans[1].lessons_count, 12);
        assert_eq!(config.plans[0].price, 4000.0);
        let admin = config.admin.unwrap();
        assert_eq!(admin.username, "owner");
        assert!(admin.email.is_empty());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.auth.account_header, "x-account-id");
        assert_eq!(config.schedule.birthday_window_days, 3);
        assert!(config.plans.is_empty());
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let result = parse_config("[[plans]]\nname = 3");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
