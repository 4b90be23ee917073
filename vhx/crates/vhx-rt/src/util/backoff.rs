//! Bounded retry with exponential backoff
//!
//! Used by the retrying weak compare-and-set. Each failed attempt spins for
//! `2^step` iterations until `step` reaches the backoff limit, then yields
//! the thread instead.

use crate::config::VhConfig;
use crate::error::Result;
use std::thread;

/// Largest spin step; `2^16` spins is the longest single snooze
pub const MAX_SPIN_STEP: u32 = 16;

/// Exponential spin-then-yield backoff
#[derive(Debug)]
pub struct Backoff {
    step: u32,
    limit: u32,
}

impl Backoff {
    /// Backoff spinning for at most `limit + 1` steps, capped at [`MAX_SPIN_STEP`]
    pub fn new(limit: u32) -> Self {
        Self {
            step: 0,
            limit: limit.min(MAX_SPIN_STEP),
        }
    }

    /// Back off once; spins grow exponentially up to the limit
    pub fn snooze(&mut self) {
        if self.step <= self.limit {
            for _ in 0..(1u32 << self.step) {
                std::hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }
        self.step = self.step.saturating_add(1);
    }

    /// True once spinning has given way to yielding
    pub fn is_yielding(&self) -> bool {
        self.step > self.limit
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }
}

/// Bound on a retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Spinning steps before the backoff starts yielding
    pub backoff_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            backoff_limit: 6,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &VhConfig) -> Self {
        Self {
            max_attempts: config.weak_cas_max_attempts,
            backoff_limit: config.weak_cas_backoff_limit,
        }
    }

    /// Run `attempt` until it yields `Some`, fails, or attempts run out
    ///
    /// Returns `Ok(None)` when every attempt returned `None`.
    pub fn run<T, F>(&self, mut attempt: F) -> Result<Option<T>>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        let mut backoff = Backoff::new(self.backoff_limit);
        for _ in 0..self.max_attempts {
            if let Some(done) = attempt()? {
                return Ok(Some(done));
            }
            backoff.snooze();
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VhError;

    #[test]
    fn test_run_stops_on_success() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let out = policy
            .run(|| {
                calls += 1;
                Ok((calls == 3).then_some(calls))
            })
            .unwrap();
        assert_eq!(out, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_run_is_bounded() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_limit: 1,
        };
        let mut calls = 0;
        let out: Option<()> = policy
            .run(|| {
                calls += 1;
                Ok(None)
            })
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_run_propagates_errors() {
        let policy = RetryPolicy::default();
        let err = policy
            .run::<(), _>(|| Err(VhError::IllegalAccess("stop".to_string())))
            .unwrap_err();
        assert_eq!(err, VhError::IllegalAccess("stop".to_string()));
    }

    #[test]
    fn test_backoff_switches_to_yield() {
        let mut backoff = Backoff::new(2);
        for _ in 0..3 {
            assert!(!backoff.is_yielding());
            backoff.snooze();
        }
        assert!(backoff.is_yielding());
        backoff.reset();
        assert!(!backoff.is_yielding());
    }

    #[test]
    fn test_large_backoff_limit_is_capped() {
        let mut backoff = Backoff::new(40);
        for _ in 0..=MAX_SPIN_STEP {
            assert!(!backoff.is_yielding());
            backoff.snooze();
        }
        assert!(backoff.is_yielding());
        // Past the shift width of the spin counter.
        for _ in 0..40 {
            backoff.snooze();
        }

        let policy = RetryPolicy {
            max_attempts: 40,
            backoff_limit: 40,
        };
        let mut calls = 0;
        let out: Option<()> = policy
            .run(|| {
                calls += 1;
                Ok(None)
            })
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(calls, 40);
    }

    #[test]
    fn test_from_config() {
        let config = VhConfig {
            weak_cas_max_attempts: 7,
            ..VhConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 7);
    }
}
