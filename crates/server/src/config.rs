//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LINKBRAIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `LINKBRAIN_TOKEN_SECRET` - HMAC key for user bearer tokens (min 32 chars, high entropy)
//! - `LINKBRAIN_ADMIN_TOKEN` - Bearer token for `/admin` routes (min 32 chars, high entropy)
//!
//! ## Optional
//! - `LINKBRAIN_HOST` - Bind address (default: 127.0.0.1)
//! - `LINKBRAIN_PORT` - Listen port (default: 3000)
//! - `LINKBRAIN_CORS_ORIGINS` - Comma-separated allowed origins
//! - `LINKBRAIN_UTC_OFFSET_HOURS` - Local offset for analytics and legacy dates (default: 9)
//! - `LINKBRAIN_TOKEN_TTL_DAYS` - User token lifetime (default: 30)
//! - `OPENAI_BASE_URL` / `OPENAI_MODEL` - `OpenAI` endpoint and model
//! - `GEMINI_BASE_URL` / `GEMINI_MODEL` - Gemini endpoint and model
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling
//! - `LOG_FORMAT` - `json` for structured logs

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use chrono::FixedOffset;
use linkbrain_core::timestamp::{DEFAULT_OFFSET_HOURS, offset_from_hours};
use secrecy::SecretString;
use thiserror::Error;

const MIN_SECRET_LENGTH: usize = 32;
const MIN_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Lowercase fragments found in copied-in sample values.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "changeme",
    "placeholder",
    "example",
    "your-",
    "secret",
    "password",
    "linkbrain",
    "xxx",
    "todo",
];

/// Why the environment could not be turned into a [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Contains the database password
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Origins allowed by CORS; empty means same-origin only
    pub cors_origins: Vec<String>,
    /// Offset used for analytics bucketing and naive legacy timestamps
    pub utc_offset: FixedOffset,
    pub auth: AuthConfig,
    pub ai: AiConfig,
    pub sentry: SentryConfig,
    /// Emit JSON logs instead of human-readable ones
    pub json_logs: bool,
}

/// Token signing and admin credentials. `Debug` prints neither secret.
#[derive(Clone)]
pub struct AuthConfig {
    pub token_secret: SecretString,
    pub admin_token: SecretString,
    pub token_ttl_days: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("admin_token", &"[REDACTED]")
            .field("token_ttl_days", &self.token_ttl_days)
            .finish()
    }
}

/// LLM provider endpoints. API keys are supplied per request.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub openai_base_url: String,
    pub openai_model: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: Option<f32>,
    pub traces_sample_rate: Option<f32>,
}

impl ServerConfig {
    /// Read the process environment, after merging a `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// Fails on a missing required variable, an unparsable value, or a
    /// secret that [`check_secret`] rejects.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = database_url("LINKBRAIN_DATABASE_URL")?;
        let host = parse_env("LINKBRAIN_HOST", "127.0.0.1")?;
        let port = parse_env("LINKBRAIN_PORT", "3000")?;
        let cors_origins = env_var("LINKBRAIN_CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        let offset_hours: i32 =
            parse_env("LINKBRAIN_UTC_OFFSET_HOURS", &DEFAULT_OFFSET_HOURS.to_string())?;
        let utc_offset = offset_from_hours(offset_hours).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "LINKBRAIN_UTC_OFFSET_HOURS".to_string(),
                format!("{offset_hours} is not a valid UTC offset"),
            )
        })?;

        let auth = AuthConfig::from_env()?;
        let ai = AiConfig::from_env();
        let sentry = SentryConfig::from_env()?;
        let json_logs = env_var("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            host,
            port,
            cors_origins,
            utc_offset,
            auth,
            ai,
            sentry,
            json_logs,
        })
    }

    /// Where the listener binds.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let token_secret = secret_env("LINKBRAIN_TOKEN_SECRET")?;
        let admin_token = secret_env("LINKBRAIN_ADMIN_TOKEN")?;

        let token_ttl_days: i64 = parse_env("LINKBRAIN_TOKEN_TTL_DAYS", "30")?;
        if token_ttl_days <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "LINKBRAIN_TOKEN_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            token_secret,
            admin_token,
            token_ttl_days,
        })
    }
}

impl AiConfig {
    fn from_env() -> Self {
        Self {
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: env_var("SENTRY_DSN"),
            environment: env_var("SENTRY_ENVIRONMENT"),
            sample_rate: parse_optional_env("SENTRY_SAMPLE_RATE")?,
            traces_sample_rate: parse_optional_env("SENTRY_TRACES_SAMPLE_RATE")?,
        })
    }
}

/// Database URL, falling back to the generic `DATABASE_URL`.
fn database_url(key: &str) -> Result<SecretString, ConfigError> {
    env_var(key)
        .or_else(|| env_var("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Set and non-blank.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &env_or(key, default))
}

fn parse_optional_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key).map(|raw| parse_value(key, &raw)).transpose()
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// A required secret that passes [`check_secret`].
fn secret_env(key: &str) -> Result<SecretString, ConfigError> {
    let value = env_var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    check_secret(&value)
        .map_err(|problem| ConfigError::InsecureSecret(key.to_string(), problem))?;
    Ok(SecretString::from(value))
}

/// Rejects short values, obvious placeholders and low-entropy strings.
fn check_secret(value: &str) -> Result<(), String> {
    let length = value.chars().count();
    if length < MIN_SECRET_LENGTH {
        return Err(format!(
            "needs {MIN_SECRET_LENGTH} or more characters, found {length}"
        ));
    }

    let lower = value.to_lowercase();
    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(format!("looks like a placeholder ('{marker}')"));
    }

    let bits = bits_per_char(value);
    if bits < MIN_BITS_PER_CHAR {
        return Err(format!(
            "too predictable ({bits:.2} bits per character, want {MIN_BITS_PER_CHAR:.1}); generate it randomly"
        ));
    }
    Ok(())
}

/// Shannon entropy of the character distribution.
#[allow(clippy::cast_precision_loss)]
fn bits_per_char(value: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total = counts.values().sum::<u32>();
    if total == 0 {
        return 0.0;
    }

    counts
        .values()
        .map(|&n| f64::from(n) / f64::from(total))
        .map(|p| -p * p.log2())
        .sum()
}

/// Configuration with fixed, valid values for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/linkbrain_test"),
        host: "127.0.0.1".parse().expect("valid test value"),
        port: 3000,
        cors_origins: Vec::new(),
        utc_offset: offset_from_hours(9).expect("valid test value"),
        auth: AuthConfig {
            token_secret: SecretString::from("k7Qm2vX9pL4wR8tZ1nB6cY3hJ5dF0gS2"),
            admin_token: SecretString::from("A9z!Lq3#Vm7$Rt1^Wx5&Np8*Hc2@Kd6%"),
            token_ttl_days: 30,
        },
        ai: AiConfig::default(),
        sentry: SentryConfig::default(),
        json_logs: false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!(bits_per_char("zzzz").abs() < f64::EPSILON);
        assert!((bits_per_char("abab") - 1.0).abs() < 1e-9);
        assert!((bits_per_char("abcd") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_check_secret_rejects_short_values() {
        let err = check_secret("k7Qm2vX9").unwrap_err();
        assert!(err.contains("found 8"));
    }

    #[test]
    fn test_check_secret_rejects_placeholders() {
        let err = check_secret("please-changeme-before-deploying-0123").unwrap_err();
        assert!(err.contains("changeme"));
    }

    #[test]
    fn test_check_secret_rejects_repetitive_values() {
        assert!(check_secret(&"q1".repeat(20)).is_err());
    }

    #[test]
    fn test_check_secret_accepts_test_credentials() {
        let config = test_config();
        assert!(check_secret(secrecy::ExposeSecret::expose_secret(&config.auth.token_secret)).is_ok());
        assert!(check_secret(secrecy::ExposeSecret::expose_secret(&config.auth.admin_token)).is_ok());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://app.linkbrain.io/ ,, http://localhost:5173"),
            vec!["https://app.linkbrain.io", "http://localhost:5173"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_parse_value_reports_the_key() {
        let err = parse_value::<u16>("LINKBRAIN_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "LINKBRAIN_PORT"));
        assert_eq!(parse_value::<u16>("LINKBRAIN_PORT", " 8080 ").unwrap(), 8080);
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_auth_config_debug_redacts_secrets() {
        let rendered = format!("{:?}", test_config().auth);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("k7Qm2vX9pL4wR8tZ"));
        assert!(rendered.contains("token_ttl_days: 30"));
    }
}
