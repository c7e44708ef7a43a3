//! Retry with exponential backoff for completion requests

use std::time::{Duration, SystemTime};

/// Retry policy for completion API calls
///
/// Controls how many times a failed request is retried and how
/// long to wait between attempts using exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Whether an HTTP status is worth retrying: rate limits (429) and
/// server errors (5xx)
#[must_use]
pub fn is_recoverable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Parse a `Retry-After` header value given in whole seconds
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Compute the delay before the next retry attempt.
///
/// A server-provided `retry_after` wins but is capped at `policy.max_delay`.
/// Otherwise `min(base_delay * 2^attempt + jitter, max_delay)`, with 0-25%
/// jitter taken from the system clock's subsecond nanos.
#[must_use]
pub fn delay_for_attempt(
    policy: &RetryPolicy,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(ra) = retry_after {
        return ra.min(policy.max_delay);
    }

    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let base = base.min(policy.max_delay);

    let jitter_nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let jitter_fraction = f64::from(jitter_nanos % 250) / 1000.0;
    let jitter = base.mul_f64(jitter_fraction);

    (base + jitter).min(policy.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_statuses() {
        assert!(is_recoverable(429));
        assert!(is_recoverable(500));
        assert!(is_recoverable(503));
        assert!(!is_recoverable(400));
        assert!(!is_recoverable(401));
        assert!(!is_recoverable(402));
        assert!(!is_recoverable(200));
    }

    #[test]
    fn parses_retry_after_seconds() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn caps_retry_after_at_max_delay() {
        let policy = RetryPolicy::default();
        let delay = delay_for_attempt(&policy, 0, Some(Duration::from_secs(60)));
        assert_eq!(delay, policy.max_delay);
    }

    #[test]
    fn exponential_growth_with_bounded_jitter() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            ..RetryPolicy::default()
        };

        let d0 = delay_for_attempt(&policy, 0, None);
        let d2 = delay_for_attempt(&policy, 2, None);
        assert!(d0 >= Duration::from_millis(100) && d0 <= Duration::from_millis(125));
        assert!(d2 >= Duration::from_millis(400) && d2 <= Duration::from_millis(500));
    }
}
