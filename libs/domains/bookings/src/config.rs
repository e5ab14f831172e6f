use core_config::{env_parse, ConfigError, FromEnv};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Tuning knobs for the booking engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingConfig {
    /// Upper bound on waiting for a listing's availability lock
    pub lock_timeout: Duration,
    /// Extra attempts after a lock timeout before giving up
    pub reserve_retries: u32,
    /// First backoff delay between attempts; doubles each retry
    pub retry_backoff: Duration,
    /// Buffered domain events per subscriber
    pub event_channel_capacity: usize,
}

impl BookingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(self.reserve_retries)
            .with_initial_delay(self.retry_backoff)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
            reserve_retries: 3,
            retry_backoff: Duration::from_millis(25),
            event_channel_capacity: 1024,
        }
    }
}

impl FromEnv for BookingConfig {
    /// - `BOOKING_LOCK_TIMEOUT_MS` (default 250)
    /// - `BOOKING_RESERVE_RETRIES` (default 3)
    /// - `BOOKING_RETRY_BACKOFF_MS` (default 25)
    /// - `BOOKING_EVENT_CHANNEL_CAPACITY` (default 1024)
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lock_timeout_ms = env_parse("BOOKING_LOCK_TIMEOUT_MS", 250u64)?;
        if lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BOOKING_LOCK_TIMEOUT_MS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        let event_channel_capacity =
            env_parse("BOOKING_EVENT_CHANNEL_CAPACITY", defaults.event_channel_capacity)?;
        if event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BOOKING_EVENT_CHANNEL_CAPACITY".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            reserve_retries: env_parse("BOOKING_RESERVE_RETRIES", defaults.reserve_retries)?,
            retry_backoff: Duration::from_millis(env_parse("BOOKING_RETRY_BACKOFF_MS", 25u64)?),
            event_channel_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 4] = [
        "BOOKING_LOCK_TIMEOUT_MS",
        "BOOKING_RESERVE_RETRIES",
        "BOOKING_RETRY_BACKOFF_MS",
        "BOOKING_EVENT_CHANNEL_CAPACITY",
    ];

    #[test]
    fn test_defaults_when_unset() {
        temp_env::with_vars_unset(KEYS, || {
            let config = BookingConfig::from_env().unwrap();
            assert_eq!(config, BookingConfig::default());
        });
    }

    #[test]
    fn test_custom_values() {
        temp_env::with_vars(
            [
                ("BOOKING_LOCK_TIMEOUT_MS", Some("500")),
                ("BOOKING_RESERVE_RETRIES", Some("5")),
                ("BOOKING_RETRY_BACKOFF_MS", Some("10")),
                ("BOOKING_EVENT_CHANNEL_CAPACITY", Some("16")),
            ],
            || {
                let config = BookingConfig::from_env().unwrap();
                assert_eq!(config.lock_timeout, Duration::from_millis(500));
                assert_eq!(config.reserve_retries, 5);
                assert_eq!(config.retry_backoff, Duration::from_millis(10));
                assert_eq!(config.event_channel_capacity, 16);
                assert_eq!(config.retry_policy().max_retries, 5);
            },
        );
    }

    #[test]
    fn test_zero_lock_timeout_is_rejected() {
        temp_env::with_var("BOOKING_LOCK_TIMEOUT_MS", Some("0"), || {
            let err = BookingConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("BOOKING_LOCK_TIMEOUT_MS"));
        });
    }

    #[test]
    fn test_unparsable_retries() {
        temp_env::with_var("BOOKING_RESERVE_RETRIES", Some("many"), || {
            assert!(matches!(
                BookingConfig::from_env(),
                Err(ConfigError::ParseError { .. })
            ));
        });
    }
}
