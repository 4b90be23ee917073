//! Memory orderings
//!
//! Every access mode is offered at up to four visibility tiers. They map
//! onto the Rust atomic orderings as follows:
//!
//! | tier     | loads   | stores  | read-modify-write | CAS failure |
//! |----------|---------|---------|-------------------|-------------|
//! | Plain    | Relaxed | Relaxed | Relaxed           | Relaxed     |
//! | Opaque   | Relaxed | Relaxed | Relaxed           | Relaxed     |
//! | Acquire  | Acquire | -       | Acquire           | Acquire     |
//! | Release  | -       | Release | Release           | Relaxed     |
//! | Volatile | SeqCst  | SeqCst  | SeqCst            | SeqCst      |
//!
//! Plain accesses are relaxed atomics rather than unsynchronized accesses:
//! racing plain accesses must not be undefined behaviour in safe Rust.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::Ordering;

/// Visibility tier of an access
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryOrder {
    Plain,
    Opaque,
    Acquire,
    Release,
    Volatile,
}

impl MemoryOrder {
    pub const ALL: [MemoryOrder; 5] = [
        MemoryOrder::Plain,
        MemoryOrder::Opaque,
        MemoryOrder::Acquire,
        MemoryOrder::Release,
        MemoryOrder::Volatile,
    ];

    /// Ordering for a plain load
    ///
    /// `Release` has no load form and is strengthened to `SeqCst`.
    #[inline]
    pub fn load(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Release | MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    /// Ordering for a plain store
    ///
    /// `Acquire` has no store form and is strengthened to `SeqCst`.
    #[inline]
    pub fn store(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque => Ordering::Relaxed,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::Acquire | MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    /// Ordering for the successful half of a read-modify-write
    #[inline]
    pub fn rmw(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    /// Ordering for the failed half of a compare-exchange
    ///
    /// A failed exchange is a load, so it can never carry release semantics.
    #[inline]
    pub fn failure(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque | MemoryOrder::Release => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    /// Whether the tier is a legal ordering for reads
    pub fn is_read_order(self) -> bool {
        self != MemoryOrder::Release
    }

    /// Whether the tier is a legal ordering for writes
    pub fn is_write_order(self) -> bool {
        self != MemoryOrder::Acquire
    }
}

impl fmt::Display for MemoryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryOrder::Plain => "plain",
            MemoryOrder::Opaque => "opaque",
            MemoryOrder::Acquire => "acquire",
            MemoryOrder::Release => "release",
            MemoryOrder::Volatile => "volatile",
        };
        f.write_str(name)
    }
}
