//! Runtime configuration loaded from environment variables.
//!
//! Every setting has a default, so an empty environment yields a usable
//! config. Invalid values fail loading instead of being ignored.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use crate::model::event::{Capacity, DEFAULT_CAPACITY};
use crate::service::profile_resolver::{FallbackEmailPolicy, DEFAULT_FALLBACK_DOMAIN};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "CORAH_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CORAH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CORAH_LOG_DIR";
pub const ENV_FALLBACK_EMAIL_DOMAIN: &str = "CORAH_FALLBACK_EMAIL_DOMAIN";
pub const ENV_DEFAULT_CAPACITY: &str = "CORAH_DEFAULT_CAPACITY";

const DEFAULT_DB_PATH: &str = "corah.sqlite3";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value `{value}` for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Core runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of trace, debug, info, warn, error.
    pub log_level: String,
    /// Absolute log directory; file logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Domain used for synthesized attendee addresses.
    pub fallback_email_domain: String,
    /// Seats offered by events created without an explicit capacity.
    pub default_capacity: Capacity,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            fallback_email_domain: DEFAULT_FALLBACK_DOMAIN.to_string(),
            default_capacity: Capacity::new(DEFAULT_CAPACITY),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            let normalized = normalize_level(&level).map_err(|err| ConfigError {
                key: ENV_LOG_LEVEL,
                value: level.clone(),
                reason: err.to_string(),
            })?;
            config.log_level = normalized.to_string();
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            let normalized =
                normalize_log_dir(PathBuf::from(&dir).as_path()).map_err(|err| ConfigError {
                    key: ENV_LOG_DIR,
                    value: dir.clone(),
                    reason: err.to_string(),
                })?;
            config.log_dir = Some(normalized);
        }
        if let Some(domain) = read(ENV_FALLBACK_EMAIL_DOMAIN) {
            validate_domain(&domain)?;
            config.fallback_email_domain = domain.to_ascii_lowercase();
        }
        if let Some(capacity) = read(ENV_DEFAULT_CAPACITY) {
            let seats = capacity.parse::<u32>().map_err(|err| ConfigError {
                key: ENV_DEFAULT_CAPACITY,
                value: capacity.clone(),
                reason: err.to_string(),
            })?;
            config.default_capacity = Capacity::new(seats);
        }

        Ok(config)
    }

    pub fn fallback_policy(&self) -> FallbackEmailPolicy {
        FallbackEmailPolicy::new(self.fallback_email_domain.clone())
    }
}

fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError {
        key: ENV_FALLBACK_EMAIL_DOMAIN,
        value: domain.to_string(),
        reason: reason.to_string(),
    };
    if domain.contains('@') || domain.chars().any(char::is_whitespace) {
        return Err(invalid("expected a bare domain name"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("expected a dotted domain name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DEFAULT_CAPACITY, ENV_FALLBACK_EMAIL_DOMAIN, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(vars: &[(&str, &str)]) -> Result<CoreConfig, super::ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.db_path, PathBuf::from("corah.sqlite3"));
        assert_eq!(config.fallback_policy().domain(), "example.com");
        assert_eq!(config.default_capacity.get(), 50);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_normalized() {
        let config = load(&[
            ("CORAH_DB_PATH", "/var/lib/corah/db.sqlite3"),
            ("CORAH_LOG_LEVEL", " WARNING "),
            (ENV_FALLBACK_EMAIL_DOMAIN, "Attendees.Example.org"),
            (ENV_DEFAULT_CAPACITY, "120"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/corah/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.fallback_email_domain, "attendees.example.org");
        assert_eq!(config.default_capacity.get(), 120);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[(ENV_DEFAULT_CAPACITY, "-3")]).unwrap_err();
        assert_eq!(err.key, ENV_DEFAULT_CAPACITY);
        assert!(load(&[(ENV_FALLBACK_EMAIL_DOMAIN, "user@example.com")]).is_err());
        assert!(load(&[(ENV_LOG_DIR, "relative/logs")]).is_err());
        assert!(load(&[("CORAH_LOG_LEVEL", "loud")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[(ENV_FALLBACK_EMAIL_DOMAIN, "   ")]).unwrap();
        assert_eq!(config.fallback_email_domain, "example.com");
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = load(&[(ENV_DEFAULT_CAPACITY, "7")]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
