//! Reclamation probe
//!
//! Memory freed through epoch-based reclamation (replaced reference slot
//! values, evicted dispatch entries) is released only after the global
//! epoch advances. The probe drives that forward and waits for a predicate,
//! typically "this loader is gone".

use crate::class::ClassLoader;
use crate::config::VhConfig;
use crate::logging::{log_event, VhEvent};
use crossbeam::epoch;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Bounded attempts at releasing deferred garbage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimProbe {
    attempts: u32,
    interval: Duration,
}

impl Default for ReclaimProbe {
    fn default() -> Self {
        Self::from_config(&VhConfig::default())
    }
}

impl ReclaimProbe {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    pub fn from_config(config: &VhConfig) -> Self {
        Self::new(
            config.reclaim_attempts,
            Duration::from_millis(config.reclaim_interval_ms),
        )
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Flush deferred garbage until `reclaimed` holds
    ///
    /// Returns the 1-based attempt that succeeded, or `None` when every
    /// attempt failed.
    pub fn reclaim_until<F>(&self, mut reclaimed: F) -> Option<u32>
    where
        F: FnMut() -> bool,
    {
        for attempt in 1..=self.attempts {
            // Each pinned flush lets the global epoch advance one step.
            for _ in 0..3 {
                epoch::pin().flush();
            }
            let done = reclaimed();
            log_event(VhEvent::ReclaimAttempt {
                attempt,
                reclaimed: done,
            });
            if done {
                return Some(attempt);
            }
            thread::sleep(self.interval);
        }
        log::debug!("reclamation not observed after {} attempts", self.attempts);
        None
    }
}

/// Weak reference to a loader, for observing its reclamation
#[derive(Debug, Clone)]
pub struct LoaderWatch {
    loader: Weak<ClassLoader>,
    name: String,
}

impl LoaderWatch {
    pub fn new(loader: &Arc<ClassLoader>) -> Self {
        Self {
            loader: Arc::downgrade(loader),
            name: loader.name().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_reclaimed(&self) -> bool {
        self.loader.strong_count() == 0
    }
}
