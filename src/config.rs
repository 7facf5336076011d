//! Service configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` (if present) and calls `Config::from_env` once at
//! start-up. Parsing goes through a lookup closure so tests can feed values
//! without touching process-global environment state.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_SETTLE_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_SESSION_CELL_MAX_AGE_SECS: u64 = 300;
pub const DEFAULT_SIGN_IN_RATE_LIMIT: usize = 5;
pub const DEFAULT_SIGN_IN_RATE_WINDOW_SECS: u64 = 60;
pub const DEFAULT_SIGN_IN_GLOBAL_LIMIT: usize = 100;
pub const DEFAULT_SIGN_IN_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("unknown AUTH_PROVIDER: {0:?} (expected gotrue or memory)")]
    UnknownAuthProvider(String),
}

/// Connection settings for a GoTrue-compatible auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTrueConfig {
    /// Project base URL; `/auth/v1/...` is appended per call.
    pub url: String,
    /// Value sent in the `apikey` header.
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBackend {
    GoTrue(GoTrueConfig),
    /// In-process accounts; sessions do not survive a restart.
    Memory,
}

impl AuthBackend {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GoTrue(_) => "gotrue",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a guard waits for a fresh session cell to settle.
    pub settle_timeout: Duration,
    /// Cells older than this are re-spawned so the provider is asked again.
    pub cell_max_age: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInLimits {
    pub per_email_limit: usize,
    pub per_email_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
}

impl Default for SignInLimits {
    fn default() -> Self {
        Self {
            per_email_limit: DEFAULT_SIGN_IN_RATE_LIMIT,
            per_email_window: Duration::from_secs(DEFAULT_SIGN_IN_RATE_WINDOW_SECS),
            global_limit: DEFAULT_SIGN_IN_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_SIGN_IN_GLOBAL_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub auth: AuthBackend,
    pub cookie_secure: bool,
    pub sessions: SessionConfig,
    pub sign_in_limits: SignInLimits,
    /// Emails granted the admin role when their profile is first created.
    pub admin_emails: Vec<String>,
}

impl Config {
    /// Build config from process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let auth = parse_auth_backend(&lookup)?;

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { key: "COOKIE_SECURE", value: raw })?,
            None => matches!(&auth, AuthBackend::GoTrue(cfg) if cfg.url.starts_with("https://")),
        };

        let sessions = SessionConfig {
            settle_timeout: Duration::from_millis(parse_or(
                &lookup,
                "SESSION_SETTLE_TIMEOUT_MS",
                DEFAULT_SESSION_SETTLE_TIMEOUT_MS,
            )?),
            cell_max_age: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_CELL_MAX_AGE_SECS",
                DEFAULT_SESSION_CELL_MAX_AGE_SECS,
            )?),
        };

        let sign_in_limits = SignInLimits {
            per_email_limit: parse_or(&lookup, "SIGN_IN_RATE_LIMIT", DEFAULT_SIGN_IN_RATE_LIMIT)?,
            per_email_window: Duration::from_secs(parse_or(
                &lookup,
                "SIGN_IN_RATE_WINDOW_SECS",
                DEFAULT_SIGN_IN_RATE_WINDOW_SECS,
            )?),
            global_limit: parse_or(&lookup, "SIGN_IN_GLOBAL_LIMIT", DEFAULT_SIGN_IN_GLOBAL_LIMIT)?,
            global_window: Duration::from_secs(parse_or(
                &lookup,
                "SIGN_IN_GLOBAL_WINDOW_SECS",
                DEFAULT_SIGN_IN_GLOBAL_WINDOW_SECS,
            )?),
        };

        let admin_emails = lookup("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|email| email.trim().to_ascii_lowercase())
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { database_url, port, db_max_connections, auth, cookie_secure, sessions, sign_in_limits, admin_emails })
    }
}

fn parse_auth_backend<F>(lookup: &F) -> Result<AuthBackend, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let url = lookup("AUTH_URL").filter(|v| !v.trim().is_empty());
    let provider = lookup("AUTH_PROVIDER")
        .map(|raw| raw.trim().to_ascii_lowercase())
        .unwrap_or_else(|| if url.is_some() { "gotrue".into() } else { "memory".into() });

    match provider.as_str() {
        "memory" => Ok(AuthBackend::Memory),
        "gotrue" => {
            let url = url.ok_or(ConfigError::Missing("AUTH_URL"))?;
            let api_key = lookup("AUTH_API_KEY")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("AUTH_API_KEY"))?;
            let timeout_secs = parse_or(lookup, "AUTH_TIMEOUT_SECS", DEFAULT_AUTH_TIMEOUT_SECS)?;
            Ok(AuthBackend::GoTrue(GoTrueConfig {
                url: url.trim().trim_end_matches('/').to_owned(),
                api_key,
                timeout_secs,
            }))
        }
        _ => Err(ConfigError::UnknownAuthProvider(provider)),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
