// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Everything is read once at startup and handed to the application state.
//! Nothing below reads the process environment after `Config::from_env`
//! returns.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Outbound email settings
    pub mail: MailConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Email provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Provider API key (`RESEND_API_KEY`)
    pub api_key: String,

    /// Sender address (`FROM_EMAIL`)
    pub from: String,

    /// Recipient address (`TO_EMAIL`)
    pub to: String,

    /// Provider endpoint (default: https://api.resend.com/emails)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Outbound request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTML-escape submitted values before building the body (default: false)
    #[serde(default)]
    pub escape_html: bool,
}

// Keeps the API key out of logs.
impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_key", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("escape_html", &self.escape_html)
            .finish()
    }
}

/// Per-client rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window per client IP (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Key clients on the first `X-Forwarded-For` hop (default: false)
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

/// Cross-origin policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `["*"]` allows any (default)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl MailConfig {
    /// Settings with the given credentials and default transport options.
    pub fn new(
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            escape_html: false,
        }
    }

    /// Get the outbound request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl CorsConfig {
    /// True when every origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let mail = MailConfig {
            api_key: required("RESEND_API_KEY")?,
            from: required("FROM_EMAIL")?,
            to: required("TO_EMAIL")?,
            api_url: lookup("RESEND_API_URL").unwrap_or_else(default_api_url),
            timeout_secs: parse_or(&lookup, "MAIL_TIMEOUT_SECS", default_timeout_secs())?,
            escape_html: parse_or(&lookup, "ESCAPE_HTML", false)?,
        };

        let rate_limit = RateLimitConfig {
            max_requests: nonzero(
                parse_or(&lookup, "RATE_LIMIT_MAX", default_max_requests())?,
                "RATE_LIMIT_MAX",
            )?,
            window_secs: nonzero(
                parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", default_window_secs())?,
                "RATE_LIMIT_WINDOW_SECS",
            )?,
            trust_forwarded_for: parse_or(&lookup, "TRUST_FORWARDED_FOR", false)?,
        };

        let cors = match lookup("ALLOWED_ORIGINS") {
            Some(raw) => CorsConfig {
                allowed_origins: raw
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            None => CorsConfig::default(),
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(default_bind_addr),
            mail,
            rate_limit,
            cors,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

// A zero limit or window would disable rate limiting.
fn nonzero<T>(value: T, key: &'static str) -> Result<T, ConfigError>
where
    T: Default + PartialEq + ToString,
{
    if value == T::default() {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    } else {
        Ok(value)
    }
}
