//! Sync configuration shared by every client.
//!
//! `SyncSettings` is persisted by the CLI as JSON and can be overridden from
//! the environment (`STOCKROOM_API_URL`, `STOCKROOM_API_TOKEN`,
//! `STOCKROOM_OFFLINE`, `STOCKROOM_SWEEP_INTERVAL_SECS`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::RefreshPolicy;
use crate::util::{is_http_url, normalize_text_option};

/// Default interval between periodic sweeps (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "STOCKROOM_API_URL";
pub const ENV_API_TOKEN: &str = "STOCKROOM_API_TOKEN";
pub const ENV_OFFLINE: &str = "STOCKROOM_OFFLINE";
pub const ENV_SWEEP_INTERVAL: &str = "STOCKROOM_SWEEP_INTERVAL_SECS";

/// User-facing sync configuration
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// Base URL of the stock API (e.g. `https://stock.example.com/api`)
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
    /// Never contact the API, even when configured
    #[serde(default)]
    pub force_offline: bool,
}

/// Validated settings needed to build an API client
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            refresh_policy: RefreshPolicy::default(),
            force_offline: false,
        }
    }
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("refresh_policy", &self.refresh_policy)
            .field("force_offline", &self.force_offline)
            .finish()
    }
}

impl std::fmt::Debug for RemoteSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteSettings")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl SyncSettings {
    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_API_TOKEN)) {
            self.api_token = Some(token);
        }
        if let Some(value) = normalize_text_option(lookup(ENV_OFFLINE)) {
            self.force_offline = matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(secs) = normalize_text_option(lookup(ENV_SWEEP_INTERVAL))
            .and_then(|value| value.parse::<u64>().ok())
        {
            self.sweep_interval_secs = secs;
        }
        self
    }

    /// Validated remote settings, `None` when no API is configured or the
    /// client is forced offline.
    pub fn remote(&self) -> Result<Option<RemoteSettings>> {
        if self.force_offline {
            return Ok(None);
        }
        let Some(base_url) = normalize_text_option(self.api_base_url.clone()) else {
            return Ok(None);
        };
        if !is_http_url(&base_url) {
            return Err(Error::Config(format!(
                "api_base_url must include http:// or https:// (got '{base_url}')"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Some(RemoteSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: normalize_text_option(self.api_token.clone()),
            request_timeout_secs: self.request_timeout_secs,
        }))
    }

    /// Interval between periodic sweeps, at least one second
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_sweep_every_five_minutes() {
        let settings = SyncSettings::default();
        assert_eq!(settings.sweep_interval(), Duration::from_secs(300));
        assert_eq!(settings.refresh_policy, RefreshPolicy::SweepFirst);
        assert!(settings.remote().unwrap().is_none());
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let error = serde_json::from_str::<SyncSettings>(r#"{"api_url":"https://x"}"#)
            .unwrap_err()
            .to_string();
        assert!(error.contains("unknown field"));
    }

    #[test]
    fn parse_fills_missing_fields_with_defaults() {
        let settings: SyncSettings =
            serde_json::from_str(r#"{"api_base_url":"https://stock.example.com/api/"}"#).unwrap();
        assert_eq!(settings.request_timeout_secs, 10);
        let remote = settings.remote().unwrap().unwrap();
        assert_eq!(remote.base_url, "https://stock.example.com/api");
    }

    #[test]
    fn remote_requires_http_scheme() {
        let settings = SyncSettings {
            api_base_url: Some("stock.example.com".to_string()),
            ..SyncSettings::default()
        };
        assert!(settings.remote().is_err());
    }

    #[test]
    fn force_offline_disables_remote() {
        let settings = SyncSettings {
            api_base_url: Some("https://stock.example.com".to_string()),
            force_offline: true,
            ..SyncSettings::default()
        };
        assert!(settings.remote().unwrap().is_none());
    }

    #[test]
    fn overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, " https://override.example.com "),
            (ENV_API_TOKEN, "token"),
            (ENV_OFFLINE, "yes"),
            (ENV_SWEEP_INTERVAL, "30"),
        ]);
        let settings = SyncSettings::default()
            .with_overrides(|key| env.get(key).map(|value| (*value).to_string()));

        assert_eq!(
            settings.api_base_url.as_deref(),
            Some("https://override.example.com")
        );
        assert_eq!(settings.api_token.as_deref(), Some("token"));
        assert!(settings.force_offline);
        assert_eq!(settings.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn debug_redacts_token() {
        let settings = SyncSettings {
            api_token: Some("secret".to_string()),
            ..SyncSettings::default()
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
