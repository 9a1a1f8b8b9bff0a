//! Connection settings for [`crate::OdooClient`].

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use reqwest::Url;

use crate::error::{OdooError, OdooResult};

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

pub const ENV_URL: &str = "ODOO_URL";
pub const ENV_DB: &str = "ODOO_DB";
pub const ENV_USERNAME: &str = "ODOO_USERNAME";
pub const ENV_PASSWORD: &str = "ODOO_PASSWORD";
pub const ENV_SKIP_TLS_VERIFY: &str = "ODOO_SKIP_TLS_VERIFY";
pub const ENV_AUTH_TIMEOUT_SECS: &str = "ODOO_AUTH_TIMEOUT_SECS";

#[derive(Clone)]
pub struct ClientConfig {
    pub url: String,
    pub db: String,
    pub username: String,
    pub password: String,
    /// How long an authenticated session is trusted before the next call re-authenticates.
    pub auth_timeout: Duration,
    /// Accept invalid TLS certificates. Development only.
    pub skip_tls_verify: bool,
    /// Per-request HTTP timeout. `None` means no HTTP timeout at all; the call then
    /// waits as long as the server takes, bounded only by the caller's context.
    pub request_timeout: Option<Duration>,
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("db", &self.db)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_timeout", &self.auth_timeout)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Only `http` and `https` URLs are accepted.
    pub fn new(url: &str, db: &str, username: &str, password: &str) -> OdooResult<Self> {
        let parsed = Url::parse(url).map_err(|e| OdooError::Config(format!("failed to parse Odoo URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(OdooError::Config(format!("invalid Odoo URL scheme: {}, must be http or https", parsed.scheme())));
        }
        Ok(Self {
            url: url.to_string(),
            db: db.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            skip_tls_verify: false,
            request_timeout: None,
        })
    }

    pub fn with_auth_timeout(mut self, d: Duration) -> Self { self.auth_timeout = d; self }
    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self { self.skip_tls_verify = skip; self }
    pub fn with_request_timeout(mut self, d: Duration) -> Self { self.request_timeout = Some(d); self }

    /// Read `ODOO_URL`, `ODOO_DB`, `ODOO_USERNAME`, `ODOO_PASSWORD` (required) and
    /// `ODOO_SKIP_TLS_VERIFY`, `ODOO_AUTH_TIMEOUT_SECS` (optional).
    pub fn from_env() -> OdooResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> OdooResult<Self> {
        let required = |k: &str| -> OdooResult<String> {
            get(k).filter(|v| !v.is_empty()).ok_or_else(|| OdooError::Config(format!("environment variable {} must be set", k)))
        };
        let mut cfg = Self::new(&required(ENV_URL)?, &required(ENV_DB)?, &required(ENV_USERNAME)?, &required(ENV_PASSWORD)?)?;
        if let Some(v) = get(ENV_SKIP_TLS_VERIFY) {
            cfg.skip_tls_verify = parse_bool(&v);
        }
        if let Some(v) = get(ENV_AUTH_TIMEOUT_SECS) {
            let secs: u64 = v.trim().parse().map_err(|_| OdooError::Config(format!("{} must be a number of seconds, got '{}'", ENV_AUTH_TIMEOUT_SECS, v)))?;
            cfg.auth_timeout = Duration::from_secs(secs);
        }
        Ok(cfg)
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
