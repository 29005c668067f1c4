//! Retry classification and backoff for batch requests.

use crate::config::Config;
use crate::Error;
use std::time::Duration;

/// Backoff never grows past `base_delay * 2^MAX_BACKOFF_SHIFT`.
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_count: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, base_delay: Duration) -> Self {
        Self {
            retry_count,
            base_delay,
        }
    }

    pub(crate) fn from_config(config: &Config) -> Self {
        Self::new(config.retry_count(), config.retry_base_delay())
    }

    /// Retries allowed after the first attempt.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether retry number `retry` (1-based) may run after `error`.
    pub fn should_retry(&self, retry: u32, error: &Error) -> bool {
        retry <= self.retry_count && is_retryable(error)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1 << shift)
    }
}

/// Whether a failed request is worth sending again.
///
/// Network failures (refused, reset or dropped connections), timeouts, 5xx
/// and 429 are transient. Anything else, including errors the SDK cannot
/// classify, is final.
pub fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Status { status, .. } => {
            status.is_server_error() || status.as_u16() == 429
        }
        Error::Timeout { .. } => true,
        Error::Http(err) => err.is_connect() || err.is_timeout() || err.is_request(),
        Error::Validation(_)
        | Error::Config(_)
        | Error::Shutdown
        | Error::Dropped
        | Error::Serialization(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn status(code: u16) -> Error {
        Error::from_status(StatusCode::from_u16(code).unwrap())
    }

    #[test]
    fn test_unclassified_error_not_retryable() {
        assert!(!is_retryable(&Error::Config("bad".into())));
        assert!(!is_retryable(&Error::Shutdown));
    }

    #[test]
    fn test_timeout_retryable() {
        assert!(is_retryable(&Error::Timeout {
            after: Duration::from_millis(100)
        }));
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable(&status(500)));
        assert!(is_retryable(&status(503)));
        assert!(is_retryable(&status(429)));
        assert!(!is_retryable(&status(200)));
        assert!(!is_retryable(&status(400)));
        assert!(!is_retryable(&status(404)));
    }

    #[test]
    fn test_serialization_error_not_retryable() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy::new(20, Duration::from_millis(10));
        assert_eq!(policy.delay(20), Duration::from_millis(640));
    }

    #[test]
    fn test_should_retry_bounded_by_count() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let err = status(502);

        assert!(policy.should_retry(1, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
        assert!(!policy.should_retry(1, &status(401)));
    }
}
