//! Configuration for the conversion client and orchestrator.
//!
//! All behaviour is controlled through [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config between the client and the orchestrator and to
//! log the effective settings of a run.
//!
//! # Credential resolution
//! The API key is resolved at `start()` time, most-specific first:
//!
//! 1. `config.api_key` — set explicitly by the caller.
//! 2. `CONVERTIO_API_KEY` environment variable.
//!
//! A missing key is a precondition failure surfaced before any network call,
//! never a deferred HTTP 401.

use crate::error::ConvertError;
use std::time::Duration;

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.convertio.co";

/// Configuration for a [`crate::ConversionOrchestrator`] and its client.
///
/// # Example
/// ```rust
/// use remote_convert::ConverterConfig;
/// use std::time::Duration;
///
/// let config = ConverterConfig::builder()
///     .api_key("my-key")
///     .poll_interval(Duration::from_secs(3))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Explicit API key. When `None`, `CONVERTIO_API_KEY` is consulted at
    /// `start()` time.
    pub api_key: Option<String>,

    /// Base URL of the conversion service, without a trailing slash.
    /// Default: [`DEFAULT_BASE_URL`]. Overridable for testing against a
    /// local stand-in.
    pub base_url: String,

    /// Interval between status polls while a job is converting.
    /// Default: 3 s.
    ///
    /// The service exposes no push notification, so completion latency is
    /// bounded below by this interval. Values under 1 s are clamped by the
    /// builder — polling a conversion service faster than that only burns
    /// request quota.
    pub poll_interval: Duration,

    /// Per-request timeout in seconds for every HTTP call. Default: 60.
    ///
    /// Uploads of large files dominate; status polls and submits finish in
    /// well under a second. A single timeout keeps the client simple, and
    /// 60 s accommodates a 50 MB upload on a slow uplink.
    pub request_timeout_secs: u64,

    /// How many *consecutive* poll ticks may fail at the transport level
    /// before the job is declared failed. Default: 3.
    ///
    /// A transient network blip between two successful polls should not kill
    /// a conversion that the remote service is still happily running. A
    /// remote-reported `failed` status is always immediately terminal
    /// regardless of this setting.
    pub max_poll_transport_failures: u32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(3),
            request_timeout_secs: 60,
            max_poll_transport_failures: 3,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the effective API key: explicit config first, then the
    /// `CONVERTIO_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ConvertError> {
        self.resolve_api_key_from(|name| std::env::var(name).ok())
    }

    /// Key resolution with an injectable environment lookup, so the fallback
    /// chain is testable without mutating process-wide environment state.
    fn resolve_api_key_from(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConvertError> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        match env("CONVERTIO_API_KEY") {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConvertError::MissingApiKey),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.config.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn max_poll_transport_failures(mut self, n: u32) -> Self {
        self.config.max_poll_transport_failures = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(ConvertError::InvalidConfig("base_url is empty".into()));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(ConvertError::InvalidConfig(format!(
                "base_url must be an HTTP(S) URL, got '{}'",
                c.base_url
            )));
        }
        if c.poll_interval.is_zero() {
            return Err(ConvertError::InvalidConfig(
                "poll_interval must be nonzero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConverterConfig::default();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.poll_interval, Duration::from_secs(3));
        assert_eq!(c.max_poll_transport_failures, 3);
        assert!(c.api_key.is_none());
    }

    #[test]
    fn builder_strips_trailing_slash() {
        let c = ConverterConfig::builder()
            .base_url("https://example.test/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "https://example.test");
    }

    #[test]
    fn builder_clamps_poll_interval() {
        let c = ConverterConfig::builder()
            .poll_interval(Duration::from_millis(10))
            .build()
            .unwrap();
        assert_eq!(c.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn build_rejects_non_http_base_url() {
        let err = ConverterConfig::builder()
            .base_url("ftp://example.test")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn explicit_api_key_resolves() {
        let c = ConverterConfig::builder().api_key("k123").build().unwrap();
        assert_eq!(c.resolve_api_key().unwrap(), "k123");
    }

    #[test]
    fn empty_explicit_key_falls_through_to_missing() {
        let c = ConverterConfig::builder().api_key("").build().unwrap();
        assert!(matches!(
            c.resolve_api_key_from(|_| None),
            Err(ConvertError::MissingApiKey)
        ));
    }

    #[test]
    fn env_key_used_when_no_explicit_key() {
        let c = ConverterConfig::default();
        let key = c
            .resolve_api_key_from(|name| (name == "CONVERTIO_API_KEY").then(|| "env-key".into()))
            .unwrap();
        assert_eq!(key, "env-key");
    }

    #[test]
    fn explicit_key_wins_over_env() {
        let c = ConverterConfig::builder().api_key("explicit").build().unwrap();
        let key = c
            .resolve_api_key_from(|_| Some("env-key".into()))
            .unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn empty_env_key_is_missing() {
        let c = ConverterConfig::default();
        assert!(matches!(
            c.resolve_api_key_from(|_| Some(String::new())),
            Err(ConvertError::MissingApiKey)
        ));
    }
}
