//! Configuration Module
//!
//! Handles loading and managing sweeper configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Sweeper configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval between sweep cycles
    pub sweep_interval: Duration,
    /// Fraction of expired entries (0 to 1) above which a cache is swept
    pub expire_threshold: f64,
    /// Maximum number of retained state keys per cache, None = unbounded
    pub max_states: Option<usize>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SWEEP_INTERVAL_MS` - Interval between sweep cycles in milliseconds (default: 1000)
    /// - `EXPIRE_THRESHOLD` - Expired-entry ratio that triggers a sweep (default: 0.3)
    /// - `MAX_STATES` - Cap on retained state keys per cache (default: unbounded)
    pub fn from_env() -> Self {
        Self {
            sweep_interval: Duration::from_millis(
                env::var("SWEEP_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            ),
            expire_threshold: env::var("EXPIRE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.3),
            max_states: env::var("MAX_STATES").ok().and_then(|v| v.parse().ok()),
        }
    }

    /// Validates that the expire threshold lies in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.expire_threshold) {
            return Err(CacheError::InvalidThreshold(self.expire_threshold));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(1000),
            expire_threshold: 0.3,
            max_states: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.sweep_interval, Duration::from_millis(1000));
        assert_eq!(config.expire_threshold, 0.3);
        assert!(config.max_states.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SWEEP_INTERVAL_MS");
        env::remove_var("EXPIRE_THRESHOLD");
        env::remove_var("MAX_STATES");

        let config = Config::from_env();
        assert_eq!(config.sweep_interval, Duration::from_millis(1000));
        assert_eq!(config.expire_threshold, 0.3);
        assert!(config.max_states.is_none());
    }

    #[test]
    fn test_config_validate_rejects_bad_threshold() {
        let config = Config {
            expire_threshold: 1.5,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(CacheError::InvalidThreshold(1.5))
        );
    }
}
