//! Client configuration.

use std::time::Duration;

/// Default ingestion host.
pub const DEFAULT_HOST: &str = "https://api.beacon.dev";

/// Default number of events that triggers a flush, and the max batch size.
pub const DEFAULT_FLUSH_AT: usize = 20;

/// Default flush interval.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of retries for a failed batch request.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default base delay for exponential retry backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Beacon client configuration.
///
/// Fixed once the client is built.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) api_key: String,
    pub(crate) host: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) flush_at: usize,
    pub(crate) flush_interval: Option<Duration>,
    pub(crate) enabled: bool,
    pub(crate) retry_count: u32,
    pub(crate) retry_base_delay: Duration,
}

impl Config {
    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the ingestion host, without trailing slashes.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the flush threshold (also the max batch size).
    pub fn flush_at(&self) -> usize {
        self.flush_at
    }

    /// Get the flush interval. `None` when timer-based flushing is off.
    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval
    }

    /// Whether the client sends anything at all.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Get the retry count.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Get the retry backoff base delay.
    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }
}

/// Builder for Beacon client.
#[derive(Debug)]
pub struct BeaconBuilder {
    api_key: String,
    host: Option<String>,
    timeout: Option<Duration>,
    flush_at: Option<usize>,
    flush_interval: Option<Duration>,
    enabled: bool,
    retry_count: Option<u32>,
    retry_base_delay: Option<Duration>,
}

impl BeaconBuilder {
    /// Create a new builder with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: None,
            timeout: None,
            flush_at: None,
            flush_interval: None,
            enabled: true,
            retry_count: None,
            retry_base_delay: None,
        }
    }

    /// Set the ingestion host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set how many queued events trigger a flush. Values below 1 are raised to 1.
    pub fn flush_at(mut self, count: usize) -> Self {
        self.flush_at = Some(count);
        self
    }

    /// Set the flush interval. `Duration::ZERO` disables timer-based flushing.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Enable or disable the client.
    pub fn enable(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set how many times a failed batch request is retried.
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Set the base delay of the exponential retry backoff.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    /// Build the configuration.
    pub(crate) fn build_config(self) -> Result<Config, crate::Error> {
        if self.api_key.is_empty() {
            return Err(crate::Error::Config("api_key cannot be empty".into()));
        }

        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.into());
        let flush_interval = self.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL);

        Ok(Config {
            api_key: self.api_key,
            host: host.trim_end_matches('/').to_string(),
            timeout: self.timeout,
            flush_at: self.flush_at.unwrap_or(DEFAULT_FLUSH_AT).max(1),
            flush_interval: (!flush_interval.is_zero()).then_some(flush_interval),
            enabled: self.enabled,
            retry_count: self.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            retry_base_delay: self.retry_base_delay.unwrap_or(DEFAULT_RETRY_BASE_DELAY),
        })
    }
}
