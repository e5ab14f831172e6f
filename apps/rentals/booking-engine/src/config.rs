//! Configuration for the booking engine

use core_config::server::ServerConfig;
use chrono_tz::Tz;
use core_config::{Environment, FromEnv, env_flag, env_or_default, env_parse};
use domain_bookings::BookingConfig;
use eyre::Result;
use serde_json::{Value, json};

/// Nightly, a few minutes after midnight
pub const DEFAULT_SWEEP_CRON: &str = "0 5 0 * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub bookings: BookingConfig,
    /// Six-field cron expression (with seconds) for the status sweep
    pub sweep_cron: String,
    pub sweep_enabled: bool,
    /// IANA zone the sweep's schedule and calendar date follow
    pub sweep_timezone: Tz,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            bookings: BookingConfig::from_env()?,
            sweep_cron: env_or_default("BOOKING_SWEEP_CRON", DEFAULT_SWEEP_CRON),
            sweep_enabled: env_flag("BOOKING_SWEEP_ENABLED", true)?,
            sweep_timezone: env_parse("BOOKING_SWEEP_TZ", Tz::UTC)?,
        })
    }

    /// Effective settings, for `booking-engine config`
    pub fn summary(&self) -> Value {
        json!({
            "environment": self.environment.as_str(),
            "server": {
                "host": self.server.host,
                "port": self.server.port,
            },
            "bookings": {
                "lock_timeout_ms": self.bookings.lock_timeout.as_millis() as u64,
                "reserve_retries": self.bookings.reserve_retries,
                "retry_backoff_ms": self.bookings.retry_backoff.as_millis() as u64,
                "event_channel_capacity": self.bookings.event_channel_capacity,
            },
            "sweep": {
                "enabled": self.sweep_enabled,
                "cron": self.sweep_cron,
                "timezone": self.sweep_timezone.name(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(
            [
                "APP_ENV",
                "PORT",
                "BOOKING_SWEEP_CRON",
                "BOOKING_SWEEP_ENABLED",
                "BOOKING_SWEEP_TZ",
                "BOOKING_LOCK_TIMEOUT_MS",
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.environment, Environment::Development);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.sweep_cron, DEFAULT_SWEEP_CRON);
                assert!(config.sweep_enabled);
                assert_eq!(config.sweep_timezone, Tz::UTC);
                assert_eq!(config.summary()["bookings"]["lock_timeout_ms"], 250);
            },
        );
    }

    #[test]
    fn test_sweep_can_be_disabled() {
        temp_env::with_vars(
            [
                ("BOOKING_SWEEP_ENABLED", Some("false")),
                ("BOOKING_SWEEP_CRON", Some("0 */15 * * * *")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(!config.sweep_enabled);
                assert_eq!(config.summary()["sweep"]["cron"], "0 */15 * * * *");
            },
        );
    }

    #[test]
    fn test_sweep_timezone() {
        temp_env::with_var("BOOKING_SWEEP_TZ", Some("Africa/Nairobi"), || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.sweep_timezone, chrono_tz::Africa::Nairobi);
            assert_eq!(config.summary()["sweep"]["timezone"], "Africa/Nairobi");
        });

        temp_env::with_var("BOOKING_SWEEP_TZ", Some("Mars/Olympus"), || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn test_invalid_port_fails() {
        temp_env::with_var("PORT", Some("eighty"), || {
            assert!(Config::from_env().is_err());
        });
    }
}
