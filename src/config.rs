//! Proxy configuration.
//!
//! Everything the pipeline needs besides the credential itself: which token
//! endpoint to exchange at, which reporting API and property to query, the
//! scope to request, and how long each outbound call may take.

use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_REPORT_BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_PROPERTY_ID: &str = "GA_PROPERTY_ID";
pub const ENV_TOKEN_URL: &str = "ANALYTICS_TOKEN_URL";
pub const ENV_REPORT_BASE_URL: &str = "ANALYTICS_REPORT_BASE_URL";
pub const ENV_SCOPE: &str = "ANALYTICS_SCOPE";
pub const ENV_TIMEOUT_SECS: &str = "ANALYTICS_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// OAuth token endpoint; also the assertion audience
    pub token_url: String,
    /// Reporting API base, without the `/properties/...` suffix
    pub report_base_url: String,
    pub scope: String,
    pub property_id: String,
    /// Applied to each outbound call separately
    pub timeout: Duration,
}

impl ProxyConfig {
    /// Defaults for everything except the property.
    pub fn new(property_id: impl Into<String>) -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            report_base_url: DEFAULT_REPORT_BASE_URL.to_string(),
            scope: ANALYTICS_READONLY_SCOPE.to_string(),
            property_id: property_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let property_id = optional(ENV_PROPERTY_ID)
            .ok_or_else(|| Error::Config(format!("{} is required", ENV_PROPERTY_ID)))?;
        let mut config = Self::new(property_id.trim());

        if let Some(url) = optional(ENV_TOKEN_URL) {
            config.token_url = url.trim().to_string();
        }
        if let Some(url) = optional(ENV_REPORT_BASE_URL) {
            config.report_base_url = url.trim().to_string();
        }
        if let Some(scope) = optional(ENV_SCOPE) {
            config.scope = scope.trim().to_string();
        }
        if let Some(raw) = optional(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
            })?;
            if secs == 0 {
                return Err(Error::Config(format!(
                    "{} must be greater than zero",
                    ENV_TIMEOUT_SECS
                )));
            }
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// `{base}/properties/{property_id}:runReport`, tolerating a trailing slash on `base`.
pub fn run_report_url(base: &str, property_id: &str) -> String {
    format!(
        "{}/properties/{}:runReport",
        base.trim_end_matches('/'),
        property_id
    )
}
