//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use oneflow_sync::RetryConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Connection and sync settings for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend origin, without the `/api` suffix or a trailing slash.
    pub api_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout; an expired request surfaces as a transport error.
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Where local mirrors live; `None` uses the OS data directory.
    pub mirror_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_url(api_url.into()),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::with_max_retries(DEFAULT_MAX_RETRIES),
            mirror_dir: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_mirror_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mirror_dir = Some(dir.into());
        self
    }

    /// Read `ONEFLOW_*` variables from the process environment.
    ///
    /// Missing or unparsable values fall back to defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = var("ONEFLOW_API_URL").unwrap_or_else(|| {
            tracing::warn!(default = DEFAULT_API_URL, "ONEFLOW_API_URL not set; using default");
            DEFAULT_API_URL.to_string()
        });

        let token = var("ONEFLOW_API_TOKEN");
        if token.is_none() {
            tracing::warn!("ONEFLOW_API_TOKEN not set; requests will be unauthenticated");
        }

        let timeout = parsed(var("ONEFLOW_TIMEOUT_MS"), "ONEFLOW_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        let max_retries =
            parsed(var("ONEFLOW_MAX_RETRIES"), "ONEFLOW_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES);

        Self {
            api_url: normalize_url(api_url),
            token,
            timeout,
            retry: RetryConfig::with_max_retries(max_retries),
            mirror_dir: var("ONEFLOW_MIRROR_DIR").map(PathBuf::from),
        }
    }
}

fn parsed<T: std::str::FromStr>(raw: Option<String>, key: &str) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "invalid value; using default");
            None
        }
    }
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ONEFLOW_API_URL", "https://erp.example.com/"),
            ("ONEFLOW_API_TOKEN", "secret"),
            ("ONEFLOW_TIMEOUT_MS", "2500"),
            ("ONEFLOW_MAX_RETRIES", "0"),
            ("ONEFLOW_MIRROR_DIR", "/var/lib/oneflow"),
        ]));

        assert_eq!(config.api_url, "https://erp.example.com");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.retry, RetryConfig::with_max_retries(0));
        assert_eq!(config.mirror_dir, Some(PathBuf::from("/var/lib/oneflow")));
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ONEFLOW_TIMEOUT_MS", "soon"),
            ("ONEFLOW_MAX_RETRIES", "-1"),
            ("ONEFLOW_API_TOKEN", "   "),
        ]));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.token, None);
    }
}
