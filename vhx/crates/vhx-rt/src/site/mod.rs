//! Site Module - polymorphic dispatch caches
//!
//! An [`AccessSite`] stands for one call site that invokes one access on
//! whatever handle it is given. It remembers the dispatch entries of the
//! last few handles seen, in a small fixed table indexed by a hash of the
//! handle id.
//!
//! ## Entries
//!
//! An entry records the handle id, a `Weak` to the handle state, the
//! location shape and the invocation behavior. A lookup hits only when all
//! of them match the handle passed in; a collision falls back to the
//! uncached path and replaces the slot. Entries never hold a strong
//! reference to a handle, class or loader, so a site cannot keep a dropped
//! loader alive.
//!
//! ## Concurrency
//!
//! Entries are immutable once published. Slots are swapped with
//! `crossbeam::epoch` and replaced entries are reclaimed after every
//! concurrent reader has left its critical section. Lookups never block,
//! and the storage touched is always the storage of the handle passed in.

use crate::access::{Access, MethodType};
use crate::config::DEFAULT_SITE_CAPACITY;
use crate::error::{Result, VhError};
use crate::handle::{AccessEntry, HandleId, HandleInner, InvokeBehavior, LocationShape, VarHandle};
use crate::logging::{log_event, VhEvent};
use crate::types::Value;
use crossbeam::epoch::{self, Atomic, Owned};
use crossbeam::utils::CachePadded;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::fmt;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

struct SiteEntry {
    handle_id: HandleId,
    state: Weak<HandleInner>,
    shape: LocationShape,
    behavior: InvokeBehavior,
    entry: AccessEntry,
}

impl SiteEntry {
    fn matches(&self, handle: &VarHandle) -> bool {
        self.handle_id == handle.id()
            && handle.is_same_state(&self.state)
            && self.behavior == handle.behavior()
            && self.shape == handle.shape()
    }
}

/// Counters of a dispatch site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl SiteStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Call-site cache for one access over many handles
pub struct AccessSite {
    access: Access,
    call_type: Option<MethodType>,
    slots: Box<[CachePadded<Atomic<SiteEntry>>]>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl AccessSite {
    /// Site accepting any handle that supports `access`
    pub fn generic(access: Access) -> Self {
        Self::with_capacity(access, None, DEFAULT_SITE_CAPACITY)
    }

    /// Site whose callers use the exact type `call_type`
    ///
    /// Handles whose access type differs fail with `WrongMethodType`.
    pub fn exact(access: Access, call_type: MethodType) -> Self {
        Self::with_capacity(access, Some(call_type), DEFAULT_SITE_CAPACITY)
    }

    /// Capacity is rounded up to a power of two
    pub fn with_capacity(access: Access, call_type: Option<MethodType>, capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            access,
            call_type,
            slots: (0..capacity).map(|_| CachePadded::new(Atomic::null())).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn call_type(&self) -> Option<&MethodType> {
        self.call_type.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot_index(&self, id: HandleId) -> usize {
        let mut hasher = FxHasher::default();
        hasher.write_u64(id.as_u64());
        (hasher.finish() as usize) & (self.slots.len() - 1)
    }

    /// Invoke the site's access on `handle`
    pub fn invoke(&self, handle: &VarHandle, args: &[Value]) -> Result<Value> {
        let guard = epoch::pin();
        let index = self.slot_index(handle.id());
        let slot = &self.slots[index];

        // SAFETY: entries are only destroyed through `defer_destroy`, and
        // `guard` keeps this one alive.
        if let Some(cached) = unsafe { slot.load(Ordering::Acquire, &guard).as_ref() } {
            if cached.matches(handle) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return handle.invoke_entry(&cached.entry, args);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let entry = handle.entry(self.access)?.clone();
        if let Some(call_type) = &self.call_type {
            if *call_type != entry.method_type {
                return Err(VhError::wrong_method_type(&entry.method_type, call_type));
            }
        }
        let result = handle.invoke_entry(&entry, args);

        let fresh = Owned::new(SiteEntry {
            handle_id: handle.id(),
            state: handle.downgrade(),
            shape: handle.shape(),
            behavior: handle.behavior(),
            entry,
        });
        let previous = slot.swap(fresh, Ordering::AcqRel, &guard);
        log_event(VhEvent::SiteMiss {
            access: self.access.name().to_string(),
            slot: index,
        });
        if !previous.is_null() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log_event(VhEvent::SiteEvict {
                access: self.access.name().to_string(),
                slot: index,
            });
            // SAFETY: `previous` was unlinked by the swap above.
            unsafe { guard.defer_destroy(previous) };
        }

        result
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        let guard = epoch::pin();
        self.slots
            .iter()
            .filter(|slot| !slot.load(Ordering::Acquire, &guard).is_null())
            .count()
    }

    pub fn stats(&self) -> SiteStats {
        SiteStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Drop for AccessSite {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out concurrent readers.
        unsafe {
            let guard = epoch::unprotected();
            for slot in self.slots.iter() {
                let entry = slot.swap(epoch::Shared::null(), Ordering::Relaxed, guard);
                if !entry.is_null() {
                    drop(entry.into_owned());
                }
            }
        }
    }
}

impl fmt::Debug for AccessSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessSite")
            .field("access", &self.access)
            .field("capacity", &self.slots.len())
            .field("stats", &self.stats())
            .finish()
    }
}
