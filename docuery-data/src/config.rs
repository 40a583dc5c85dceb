//! Client configuration read from the environment.
//!
//!   DOCUERY_API_BASE_URL          → explicit backend base URL (disables the port fallback)
//!   DOCUERY_REQUEST_TIMEOUT_SECS  → per-request timeout
//!   DOCUERY_STORAGE_PATH          → location of the persisted key-value file

use std::path::PathBuf;
use std::time::Duration;

/// Backend base URL used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_API_BASE_URL: &str = "DOCUERY_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DOCUERY_REQUEST_TIMEOUT_SECS";
pub const ENV_STORAGE_PATH: &str = "DOCUERY_STORAGE_PATH";

/// Settings for the API client and local persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// True when `base_url` came from explicit configuration
    pub base_url_explicit: bool,
    pub request_timeout: Duration,
    /// Override for the key-value storage file
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            base_url_explicit: false,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_path: None,
        }
    }
}

impl ClientConfig {
    /// Configuration with an explicitly chosen base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            base_url_explicit: true,
            ..Default::default()
        }
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = normalize_base_url(url.trim().to_string());
            config.base_url_explicit = true;
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => log::warn!("Ignoring invalid {}={:?}", ENV_REQUEST_TIMEOUT_SECS, raw),
            }
        }

        if let Some(path) = lookup(ENV_STORAGE_PATH).filter(|v| !v.trim().is_empty()) {
            config.storage_path = Some(PathBuf::from(path));
        }

        log::debug!(
            "Client config: base_url={} explicit={} timeout={:?}",
            config.base_url,
            config.base_url_explicit,
            config.request_timeout
        );
        config
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
        assert!(!config.base_url_explicit);
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.storage_path, None);
    }

    #[test]
    fn test_explicit_base_url_strips_trailing_slash() {
        let config = ClientConfig::from_lookup(lookup_from(&[(
            ENV_API_BASE_URL,
            "https://docs.example.com/api/",
        )]));
        assert_eq!(config.base_url, "https://docs.example.com/api");
        assert!(config.base_url_explicit);
    }

    #[test]
    fn test_invalid_timeout_keeps_default() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_REQUEST_TIMEOUT_SECS, "soon")]));
        assert_eq!(config.request_timeout, Duration::from_secs(120));

        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_REQUEST_TIMEOUT_SECS, "15")]));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }
}
