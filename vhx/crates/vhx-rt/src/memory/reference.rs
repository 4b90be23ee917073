//! Reference cells
//!
//! A reference slot holds an `Option<ObjectRef>` behind a
//! `crossbeam::epoch::Atomic`. Replaced values are retired through the epoch
//! collector, so a reader that loaded a pointer under a guard can always
//! clone the reference it points to.
//!
//! Compare-based operations compare references by identity. Two cells can
//! hold distinct boxes wrapping the same object, so a strong compare-exchange
//! re-checks identity and retries when only the box differs.

use crate::access::MemoryOrder;
use crate::object::ObjectRef;
use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use std::sync::atomic::Ordering;

pub(crate) struct ReferenceCell {
    ptr: Atomic<ObjectRef>,
}

/// Outcome of a compare-exchange: the witness value and whether it succeeded
pub(crate) struct Exchange {
    pub witness: Option<ObjectRef>,
    pub success: bool,
}

impl ReferenceCell {
    pub fn new(value: Option<ObjectRef>) -> Self {
        Self {
            ptr: match value {
                Some(obj) => Atomic::new(obj),
                None => Atomic::null(),
            },
        }
    }

    fn read(shared: Shared<'_, ObjectRef>) -> Option<ObjectRef> {
        // SAFETY: non-null pointers in the cell are only freed through
        // `defer_destroy` after being unlinked, and the caller holds a guard.
        unsafe { shared.as_ref() }.cloned()
    }

    fn publish<'g>(value: Option<ObjectRef>, guard: &'g Guard) -> Shared<'g, ObjectRef> {
        match value {
            Some(obj) => Owned::new(obj).into_shared(guard),
            None => Shared::null(),
        }
    }

    /// Take back a value that was allocated but never became visible
    fn unpublish(shared: Shared<'_, ObjectRef>) -> Option<ObjectRef> {
        if shared.is_null() {
            return None;
        }
        // SAFETY: the pointer was created by `publish` and the exchange that
        // would have published it failed, so no other thread can see it.
        Some(*unsafe { shared.into_owned() }.into_box())
    }

    fn retire(shared: Shared<'_, ObjectRef>, guard: &Guard) {
        if !shared.is_null() {
            // SAFETY: the pointer has just been unlinked from the cell.
            unsafe { guard.defer_destroy(shared) };
        }
    }

    pub fn load(&self, order: MemoryOrder) -> Option<ObjectRef> {
        let guard = epoch::pin();
        Self::read(self.ptr.load(order.load(), &guard))
    }

    pub fn store(&self, value: Option<ObjectRef>, order: MemoryOrder) {
        let guard = epoch::pin();
        let new = Self::publish(value, &guard);
        let old = self.ptr.swap(new, order.store(), &guard);
        Self::retire(old, &guard);
    }

    pub fn swap(&self, value: Option<ObjectRef>, order: MemoryOrder) -> Option<ObjectRef> {
        let guard = epoch::pin();
        let new = Self::publish(value, &guard);
        let old = self.ptr.swap(new, order.rmw(), &guard);
        let previous = Self::read(old);
        Self::retire(old, &guard);
        previous
    }

    pub fn compare_exchange(
        &self,
        expected: Option<&ObjectRef>,
        new: Option<ObjectRef>,
        order: MemoryOrder,
        weak: bool,
    ) -> Exchange {
        let guard = epoch::pin();
        let mut new = new;
        let mut current = self.ptr.load(order.failure(), &guard);

        loop {
            let witness = Self::read(current);
            if !identity_eq(witness.as_ref(), expected) {
                return Exchange {
                    witness,
                    success: false,
                };
            }

            let candidate = Self::publish(new.take(), &guard);
            let result = if weak {
                self.ptr.compare_exchange_weak(
                    current,
                    candidate,
                    order.rmw(),
                    order.failure(),
                    &guard,
                )
            } else {
                self.ptr
                    .compare_exchange(current, candidate, order.rmw(), order.failure(), &guard)
            };

            match result {
                Ok(_) => {
                    Self::retire(current, &guard);
                    return Exchange {
                        witness,
                        success: true,
                    };
                },
                Err(err) => {
                    new = Self::unpublish(err.new);
                    if weak {
                        return Exchange {
                            witness: Self::read(err.current),
                            success: false,
                        };
                    }
                    current = err.current;
                },
            }
        }
    }
}

fn identity_eq(a: Option<&ObjectRef>, b: Option<&ObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

impl Drop for ReferenceCell {
    fn drop(&mut self) {
        // SAFETY: `&mut self` guarantees no concurrent readers.
        unsafe {
            let guard = epoch::unprotected();
            let current = self.ptr.load(Ordering::Relaxed, guard);
            if !current.is_null() {
                drop(current.into_owned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_returns_previous() {
        let a = ObjectRef::string("a");
        let cell = ReferenceCell::new(Some(a.clone()));
        let prev = cell.swap(None, MemoryOrder::Volatile);
        assert!(prev.is_some_and(|p| p.ptr_eq(&a)));
        assert!(cell.load(MemoryOrder::Plain).is_none());
    }

    #[test]
    fn test_compare_exchange_uses_identity() {
        let a = ObjectRef::string("same");
        let lookalike = ObjectRef::string("same");
        let cell = ReferenceCell::new(Some(a.clone()));

        let miss = cell.compare_exchange(Some(&lookalike), None, MemoryOrder::Volatile, false);
        assert!(!miss.success);
        assert!(miss.witness.is_some_and(|w| w.ptr_eq(&a)));

        let hit = cell.compare_exchange(Some(&a), None, MemoryOrder::Volatile, false);
        assert!(hit.success);
        assert!(cell.load(MemoryOrder::Acquire).is_none());
    }

    #[test]
    fn test_strong_exchange_sees_rewrapped_identity() {
        let a = ObjectRef::string("a");
        let b = ObjectRef::string("b");
        let cell = ReferenceCell::new(Some(a.clone()));
        // Same object, fresh box.
        cell.store(Some(a.clone()), MemoryOrder::Release);

        let result = cell.compare_exchange(Some(&a), Some(b.clone()), MemoryOrder::Volatile, false);
        assert!(result.success);
        assert!(cell
            .load(MemoryOrder::Volatile)
            .is_some_and(|current| current.ptr_eq(&b)));
    }
}
