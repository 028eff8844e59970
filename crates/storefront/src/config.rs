//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `STOREFRONT_AUTH_SECRET` - Secret shared with the sign-in provider for
//!   signing identity callbacks (same strength rules)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_REPORT_CACHE_SECS` - TTL for top-rated / best-seller reports (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_REPORT_CACHE_SECS: u64 = 300;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Shared secret the sign-in provider signs callbacks with
    pub auth_secret: SecretString,
    /// How long catalog reports stay cached
    pub report_cache_ttl: Duration,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from the environment, reading `.env` first if one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing required variable, a value that
    /// does not parse, or a session secret that is short, looks like a
    /// placeholder, or has too little entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let base_url: String = env::required("STOREFRONT_BASE_URL")?;
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".into(), e.to_string()))?;

        let session_secret = env::required("STOREFRONT_SESSION_SECRET")?;
        check_secret("STOREFRONT_SESSION_SECRET", &session_secret)?;

        let auth_secret = env::required("STOREFRONT_AUTH_SECRET")?;
        check_secret("STOREFRONT_AUTH_SECRET", &auth_secret)?;

        Ok(Self {
            database_url: env::database_url()?,
            host: env::parsed_or("STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: env::parsed_or("STOREFRONT_PORT", 3000)?,
            base_url,
            session_secret: SecretString::from(session_secret),
            auth_secret: SecretString::from(auth_secret),
            report_cache_ttl: Duration::from_secs(env::parsed_or(
                "STOREFRONT_REPORT_CACHE_SECS",
                DEFAULT_REPORT_CACHE_SECS,
            )?),
            sentry: SentryConfig {
                dsn: env::optional("SENTRY_DSN"),
                environment: env::optional("SENTRY_ENVIRONMENT"),
                sample_rate: env::parsed_or("SENTRY_SAMPLE_RATE", 1.0)?,
                traces_sample_rate: env::parsed_or("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
            },
        })
    }

    /// Address the server binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

/// Environment lookups.
mod env {
    use std::str::FromStr;

    use secrecy::SecretString;

    use super::ConfigError;

    pub(super) fn required(key: &str) -> Result<String, ConfigError> {
        std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
    }

    pub(super) fn optional(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    /// Parse `key` if set, otherwise use `default`.
    pub(super) fn parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// `STOREFRONT_DATABASE_URL`, else the generic `DATABASE_URL`.
    pub(super) fn database_url() -> Result<SecretString, ConfigError> {
        optional("STOREFRONT_DATABASE_URL")
            .or_else(|| optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))
    }
}

/// Reject secrets that are short, look like placeholders, or are too
/// repetitive to be random.
fn check_secret(key: &str, secret: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(key.to_string(), reason));

    let length = secret.chars().count();
    if length < MIN_SECRET_LENGTH {
        return insecure(format!(
            "must be at least {MIN_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return insecure(format!("looks like a placeholder (contains '{pattern}')"));
    }

    let entropy = bits_per_char(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "entropy {entropy:.2} bits/char is below {MIN_ENTROPY_BITS_PER_CHAR:.1}; generate it randomly"
        ));
    }
    Ok(())
}

/// Shannon entropy of `s`, in bits per character.
fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total = counts.values().sum::<u32>();
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Configuration for unit tests. Points at a database that is never dialed.
#[cfg(test)]
pub(crate) fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/bookstore_test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: Url::parse("http://localhost:3000").expect("static url"),
        session_secret: SecretString::from("x".repeat(32)),
        auth_secret: SecretString::from("y".repeat(32)),
        report_cache_ttl: Duration::from_secs(60),
        sentry: SentryConfig::default(),
    }
}
