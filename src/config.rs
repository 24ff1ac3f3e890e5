use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::get_env_with_prefix;

/// A header name/value pair that bypasses session handling when matched.
///
/// A `header_value` of `"*"` matches any request that carries the header,
/// regardless of its value. Anything else requires an exact match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SkipHeader {
    pub header_name: String,
    pub header_value: String,
}

impl SkipHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header_name: name.into(),
            header_value: value.into(),
        }
    }
}

/// Session configuration
///
/// Constructed once at process start and threaded explicitly into the
/// middleware and signer constructors. Nothing in the request path reads
/// ambient global state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Symmetric secret for cookie signing
    ///
    /// **REQUIRED**. [`crate::session::SessionMiddleware::new`] fails fast
    /// when absent. Generate a secure value with: `openssl rand -hex 32`
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Session cookie name
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Cookie path attribute
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Cookie http_only flag
    #[serde(default = "default_http_only")]
    pub cookie_http_only: bool,

    /// Cookie secure flag (HTTPS only)
    #[serde(default = "default_secure")]
    pub cookie_secure: bool,

    /// Cookie Max-Age in seconds, doubling as the signature expiry window.
    ///
    /// `0` means a session cookie with no Max-Age attribute and no expiry
    /// check on the signed payload.
    #[serde(default)]
    pub cookie_max_age_seconds: u64,

    /// Store TTL in seconds, refreshed on every save.
    ///
    /// Defaults to 900 (15 minutes).
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Header pairs that bypass session handling entirely
    ///
    /// Used for health checks or trusted internal callers.
    #[serde(default)]
    pub skip_headers: Vec<SkipHeader>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            cookie_name: default_cookie_name(),
            cookie_path: default_cookie_path(),
            cookie_http_only: default_http_only(),
            cookie_secure: default_secure(),
            cookie_max_age_seconds: 0,
            ttl_seconds: default_ttl_seconds(),
            skip_headers: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the given signing secret and defaults
    /// for everything else.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            ..Self::default()
        }
    }

    /// Load session configuration from environment variables
    ///
    /// Each variable is checked with the `TIDEGATE_` prefix first, then
    /// unprefixed: `SESSION_SECRET_KEY`, `SESSION_COOKIE_NAME`,
    /// `SESSION_COOKIE_PATH`, `SESSION_COOKIE_SECURE`,
    /// `SESSION_COOKIE_HTTP_ONLY`, `SESSION_COOKIE_MAX_AGE`,
    /// `SESSION_TTL_SECONDS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secret) = get_env_with_prefix("SESSION_SECRET_KEY") {
            config.secret_key = Some(secret);
        }

        if let Some(name) = get_env_with_prefix("SESSION_COOKIE_NAME") {
            config.cookie_name = name;
        }

        if let Some(path) = get_env_with_prefix("SESSION_COOKIE_PATH") {
            config.cookie_path = path;
        }

        if let Some(secure) = get_env_with_prefix("SESSION_COOKIE_SECURE") {
            config.cookie_secure = secure.parse().unwrap_or(true);
        }

        if let Some(http_only) = get_env_with_prefix("SESSION_COOKIE_HTTP_ONLY") {
            config.cookie_http_only = http_only.parse().unwrap_or(true);
        }

        if let Some(max_age) = get_env_with_prefix("SESSION_COOKIE_MAX_AGE") {
            if let Ok(seconds) = max_age.parse() {
                config.cookie_max_age_seconds = seconds;
            }
        }

        if let Some(ttl) = get_env_with_prefix("SESSION_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse() {
                config.ttl_seconds = seconds;
            }
        }

        config
    }

    /// Get the store TTL as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

fn default_cookie_name() -> String {
    "sid".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_http_only() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    15 * 60 // 15 minutes
}
