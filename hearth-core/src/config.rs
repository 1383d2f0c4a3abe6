//! Environment-sourced configuration
//!
//! Every key has a documented default; malformed values are errors rather
//! than silently falling back.
//!
//! | key                       | default     |
//! |---------------------------|-------------|
//! | `DATABASE_URL`            | unset       |
//! | `DB_HOST`                 | `localhost` |
//! | `DB_PORT`                 | `5432`      |
//! | `DB_USER`                 | `postgres`  |
//! | `DB_PASSWORD`             | empty       |
//! | `DB_NAME`                 | `hearth`    |
//! | `DB_SSL_MODE`             | `prefer`    |
//! | `DB_POOL_MAX`             | `20`        |
//! | `DB_IDLE_TIMEOUT_SECS`    | `30`        |
//! | `DB_CONNECT_TIMEOUT_SECS` | `10`        |
//! | `DB_ACQUIRE_ATTEMPTS`     | `3`         |
//! | `DB_BACKOFF_BASE_MS`      | `1000`      |
//! | `DB_BACKOFF_CAP_MS`       | `5000`      |
//! | `DB_HEALTH_TIMEOUT_SECS`  | `3`         |
//! | `DB_FAULT_POLICY`         | `exit`      |
//! | `REVIEW_CACHE_TTL_SECS`   | `300`       |
//! | `REVIEW_STATS_TTL_SECS`   | `600`       |
//! | `REVIEW_AUTO_VERIFY`      | `true`      |
//!
//! `DATABASE_URL`, when set, replaces the discrete connection fields.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::db::pool::{FaultPolicy, RetryPolicy};
use crate::error::ConfigError;

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub reviews: ReviewPolicy,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub pool_max: u32,
    pub idle_timeout: Duration,
    /// Per-attempt bound on acquiring a connection
    pub connect_timeout: Duration,
    pub health_timeout: Duration,
    pub retry: RetryPolicy,
    pub fault_policy: FaultPolicy,
}

/// Time-to-live of cached review reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub list_ttl: Duration,
    pub stats_ttl: Duration,
}

/// Verification flag given to newly created reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPolicy {
    pub auto_verify: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database: DatabaseConfig::from_lookup(&lookup)?,
            cache: CacheConfig {
                list_ttl: Duration::from_secs(parse(&lookup, "REVIEW_CACHE_TTL_SECS", 300)?),
                stats_ttl: Duration::from_secs(parse(&lookup, "REVIEW_STATS_TTL_SECS", 600)?),
            },
            reviews: ReviewPolicy {
                auto_verify: parse(&lookup, "REVIEW_AUTO_VERIFY", true)?,
            },
        })
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ssl_mode = text(lookup, "DB_SSL_MODE", "prefer");
        PgSslMode::from_str(&ssl_mode)
            .map_err(|e| ConfigError::new("DB_SSL_MODE", ssl_mode.clone(), e))?;

        let attempts: u32 = parse(lookup, "DB_ACQUIRE_ATTEMPTS", 3)?;
        if attempts == 0 {
            return Err(ConfigError::new(
                "DB_ACQUIRE_ATTEMPTS",
                "0",
                "at least one attempt is required",
            ));
        }

        Ok(Self {
            url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            host: text(lookup, "DB_HOST", "localhost"),
            port: parse(lookup, "DB_PORT", 5432)?,
            user: text(lookup, "DB_USER", "postgres"),
            password: text(lookup, "DB_PASSWORD", ""),
            database: text(lookup, "DB_NAME", "hearth"),
            ssl_mode,
            pool_max: parse(lookup, "DB_POOL_MAX", 20)?,
            idle_timeout: Duration::from_secs(parse(lookup, "DB_IDLE_TIMEOUT_SECS", 30)?),
            connect_timeout: Duration::from_secs(parse(lookup, "DB_CONNECT_TIMEOUT_SECS", 10)?),
            health_timeout: Duration::from_secs(parse(lookup, "DB_HEALTH_TIMEOUT_SECS", 3)?),
            retry: RetryPolicy {
                attempts,
                base_delay: Duration::from_millis(parse(lookup, "DB_BACKOFF_BASE_MS", 1000)?),
                max_delay: Duration::from_millis(parse(lookup, "DB_BACKOFF_CAP_MS", 5000)?),
            },
            fault_policy: parse(lookup, "DB_FAULT_POLICY", FaultPolicy::Exit)?,
        })
    }

    /// Driver connect options built from the url or the discrete fields.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| ConfigError::new("DATABASE_URL", "<redacted>", e));
        }

        let ssl_mode = PgSslMode::from_str(&self.ssl_mode)
            .map_err(|e| ConfigError::new("DB_SSL_MODE", self.ssl_mode.clone(), e))?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .ssl_mode(ssl_mode);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        Ok(options)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("pool_max", &self.pool_max)
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("health_timeout", &self.health_timeout)
            .field("retry", &self.retry)
            .field("fault_policy", &self.fault_policy)
            .finish()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_ttl: Duration::from_secs(300),
            stats_ttl: Duration::from_secs(600),
        }
    }
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self { auto_verify: true }
    }
}

fn text<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_owned())
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::new(key, raw.clone(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.database, "hearth");
        assert_eq!(config.database.pool_max, 20);
        assert_eq!(config.database.retry.attempts, 3);
        assert_eq!(config.database.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.cache, CacheConfig::default());
        assert!(config.reviews.auto_verify);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_POOL_MAX", "4"),
            ("DB_BACKOFF_BASE_MS", "250"),
            ("REVIEW_CACHE_TTL_SECS", "60"),
            ("REVIEW_AUTO_VERIFY", "false"),
        ])
        .unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.pool_max, 4);
        assert_eq!(config.database.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.cache.list_ttl, Duration::from_secs(60));
        assert!(!config.reviews.auto_verify);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = load(&[("DB_PORT", "fifty")]).unwrap_err();
        assert_eq!(err.key, "DB_PORT");

        let err = load(&[("DB_SSL_MODE", "sometimes")]).unwrap_err();
        assert_eq!(err.key, "DB_SSL_MODE");

        let err = load(&[("DB_ACQUIRE_ATTEMPTS", "0")]).unwrap_err();
        assert_eq!(err.key, "DB_ACQUIRE_ATTEMPTS");

        let err = load(&[("DB_FAULT_POLICY", "ignore")]).unwrap_err();
        assert_eq!(err.key, "DB_FAULT_POLICY");
    }

    #[test]
    fn fault_policy_defaults_to_exit() {
        assert_eq!(load(&[]).unwrap().database.fault_policy, FaultPolicy::Exit);
        let config = load(&[("DB_FAULT_POLICY", "Discard")]).unwrap();
        assert_eq!(config.database.fault_policy, FaultPolicy::Discard);
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = load(&[("DB_PASSWORD", "hunter2")]).unwrap();
        let rendered = format!("{:?}", config.database);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn connect_options_from_fields_or_url() {
        let config = load(&[("DB_HOST", "db.internal"), ("DB_NAME", "catalog")]).unwrap();
        let options = config.database.connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_database(), Some("catalog"));

        let config = load(&[("DATABASE_URL", "postgres://app@pg.example:5433/listings")]).unwrap();
        let options = config.database.connect_options().unwrap();
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("listings"));
    }
}
