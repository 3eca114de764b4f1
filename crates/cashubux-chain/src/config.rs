use backoff::ExponentialBackoff;
use std::time::Duration;

/// Retry policy for calls into external collaborators
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: usize,

    /// Backoff strategy for retry delays
    pub retry_backoff: ExponentialBackoff,
}

impl RetryConfig {
    /// Near-zero delays; intended for tests and local tooling.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            retry_backoff: ExponentialBackoff {
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(5),
                max_elapsed_time: Some(Duration::from_secs(5)),
                multiplier: 1.5,
                ..Default::default()
            },
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: ExponentialBackoff {
                initial_interval: Duration::from_millis(500),
                max_interval: Duration::from_secs(30),
                max_elapsed_time: Some(Duration::from_secs(300)), // 5 minutes total
                multiplier: 2.0,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(
            config.retry_backoff.initial_interval,
            Duration::from_millis(500)
        );
        assert_eq!(
            config.retry_backoff.max_elapsed_time,
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_immediate_config() {
        let config = RetryConfig::immediate(3);
        assert_eq!(config.max_attempts, 3);
        assert!(config.retry_backoff.initial_interval < Duration::from_millis(10));
    }
}
