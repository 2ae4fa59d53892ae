//! Retry configuration for optimistic-locking conflicts.

use std::time::Duration;

/// Retry policy for conditional updates that lose a write race.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let base_delay_ms: u64 = std::env::var("SUPABASE_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);

        let max_delay_ms: u64 = std::env::var("SUPABASE_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        Self {
            max_retries: 5,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Backoff delay for the given attempt: base * 2^attempt, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exp_delay.min(self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 50);
        assert_eq!(config.max_delay_ms, 1000);
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_millis(50));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(10), Duration::from_millis(1000));
    }
}
