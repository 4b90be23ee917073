//! Configuration Module - runtime tuning parameters
//!
//! Bounds for the dispatch cache, the weak compare-and-set retry loop and the
//! reclamation probe, plus the event logging switches.

use crate::error::VhError;
use crate::util::backoff::MAX_SPIN_STEP;

/// Main configuration for the variable handle runtime
///
/// # Examples
///
/// ```rust
/// use vhx_rt::VhConfig;
///
/// let config = VhConfig {
///     site_cache_capacity: 8,
///     weak_cas_max_attempts: 64,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VhConfig {
    /// Number of slots in each [`AccessSite`](crate::site::AccessSite)
    ///
    /// Must be a power of two so the slot index is a mask of the hash.
    /// Default: 4
    pub site_cache_capacity: usize,

    /// Upper bound on attempts of a retrying weak compare-and-set
    ///
    /// Default: 1000
    pub weak_cas_max_attempts: u32,

    /// Exponent at which the weak compare-and-set backoff stops growing
    /// and starts yielding to the scheduler
    ///
    /// Default: 6
    pub weak_cas_backoff_limit: u32,

    /// Number of reclamation attempts made by the probe
    ///
    /// Default: 100
    pub reclaim_attempts: u32,

    /// Pause between reclamation attempts, in milliseconds
    ///
    /// Default: 10
    pub reclaim_interval_ms: u64,

    /// Record runtime events in the global event logger
    ///
    /// Default: true
    pub events: bool,

    /// Echo recorded events through the `log` facade
    ///
    /// Default: false
    pub verbose: bool,
}

impl Default for VhConfig {
    fn default() -> Self {
        Self {
            site_cache_capacity: DEFAULT_SITE_CAPACITY,
            weak_cas_max_attempts: 1000,
            weak_cas_backoff_limit: 6,
            reclaim_attempts: 100,
            reclaim_interval_ms: 10,
            events: true,
            verbose: false,
        }
    }
}

impl VhConfig {
    /// Validate configuration
    ///
    /// ```rust
    /// use vhx_rt::VhConfig;
    ///
    /// let config = VhConfig {
    ///     site_cache_capacity: 3,
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_cache_capacity == 0 || !self.site_cache_capacity.is_power_of_two() {
            return Err(ConfigError::InvalidSiteCapacity(format!(
                "site_cache_capacity must be a power of two, got {}",
                self.site_cache_capacity
            )));
        }

        if self.site_cache_capacity > MAX_SITE_CAPACITY {
            return Err(ConfigError::InvalidSiteCapacity(format!(
                "site_cache_capacity must be <= {MAX_SITE_CAPACITY}"
            )));
        }

        if self.weak_cas_max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy(
                "weak_cas_max_attempts must be > 0".to_string(),
            ));
        }

        if self.weak_cas_backoff_limit > MAX_SPIN_STEP {
            return Err(ConfigError::InvalidRetryPolicy(
                format!("weak_cas_backoff_limit must be <= {}", MAX_SPIN_STEP),
            ));
        }

        if self.reclaim_attempts == 0 {
            return Err(ConfigError::InvalidReclaim(
                "reclaim_attempts must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - VHX_SITE_CAPACITY
    /// - VHX_WEAK_CAS_ATTEMPTS
    /// - VHX_RECLAIM_ATTEMPTS
    /// - VHX_RECLAIM_INTERVAL_MS
    /// - VHX_EVENTS
    /// - VHX_VERBOSE
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VHX_SITE_CAPACITY") {
            if let Ok(capacity) = val.parse::<usize>() {
                config.site_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("VHX_WEAK_CAS_ATTEMPTS") {
            if let Ok(attempts) = val.parse::<u32>() {
                config.weak_cas_max_attempts = attempts;
            }
        }

        if let Ok(val) = std::env::var("VHX_RECLAIM_ATTEMPTS") {
            if let Ok(attempts) = val.parse::<u32>() {
                config.reclaim_attempts = attempts;
            }
        }

        if let Ok(val) = std::env::var("VHX_RECLAIM_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.reclaim_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("VHX_EVENTS") {
            config.events = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("VHX_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        config
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

/// Error types for configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid site cache capacity: {0}")]
    InvalidSiteCapacity(String),

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("Invalid reclamation settings: {0}")]
    InvalidReclaim(String),
}

impl From<ConfigError> for VhError {
    fn from(err: ConfigError) -> Self {
        VhError::Configuration(err.to_string())
    }
}

/// Default number of slots per dispatch site
pub const DEFAULT_SITE_CAPACITY: usize = 4;

const MAX_SITE_CAPACITY: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VhConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.site_cache_capacity, 4);
        assert_eq!(config.weak_cas_max_attempts, 1000);
    }

    #[test]
    fn test_invalid_site_capacity() {
        for capacity in [0, 3, 2048] {
            let config = VhConfig {
                site_cache_capacity: capacity,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "capacity {capacity} accepted");
        }
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = VhConfig {
            weak_cas_max_attempts: 0,
            ..Default::default()
        };
        let err: VhError = config.validate().unwrap_err().into();
        assert!(matches!(err, VhError::Configuration(_)));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
    }
}
