//! Legality table
//!
//! Which accesses a location supports depends only on its element type
//! category and whether it is writable:
//!
//! | category  | reads | writes, CAS, exchange | add | bitwise |
//! |-----------|-------|-----------------------|-----|---------|
//! | boolean   | yes   | if writable           | no  | if writable |
//! | integral  | yes   | if writable           | if writable | if writable |
//! | floating  | yes   | if writable           | if writable | no  |
//! | reference | yes   | if writable           | no  | no      |

use super::mode::{AccessMode, AccessSet};
use crate::types::{ElementType, TypeCategory};
use serde::Serialize;
use std::fmt;

/// Kind of storage a handle is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Static,
    Instance,
    Array,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Static => "static",
            StorageKind::Instance => "instance",
            StorageKind::Array => "array",
        };
        f.write_str(name)
    }
}

/// Compute the supported accesses for a location
///
/// Array cells are always writable regardless of `writable`.
///
/// ```
/// use vhx_rt::access::{supported_accesses, Access, StorageKind};
/// use vhx_rt::types::ElementType;
///
/// let set = supported_accesses(StorageKind::Instance, ElementType::Boolean, true);
/// assert!(set.contains(Access::GET_AND_BITWISE_XOR));
/// assert!(!set.contains(Access::GET_AND_ADD));
///
/// let set = supported_accesses(StorageKind::Static, ElementType::Int, false);
/// assert_eq!(set.len(), 4);
/// ```
pub fn supported_accesses(kind: StorageKind, ty: ElementType, writable: bool) -> AccessSet {
    let writable = writable || kind == StorageKind::Array;
    let category = ty.category();

    let mut set = AccessSet::EMPTY;
    set.insert_mode(AccessMode::Get);
    if !writable {
        return set;
    }

    for mode in [
        AccessMode::Set,
        AccessMode::GetAndSet,
        AccessMode::CompareAndSet,
        AccessMode::CompareAndExchange,
        AccessMode::WeakCompareAndSet,
    ] {
        set.insert_mode(mode);
    }

    if matches!(category, TypeCategory::Integral | TypeCategory::Floating) {
        set.insert_mode(AccessMode::GetAndAdd);
    }

    if matches!(category, TypeCategory::Integral | TypeCategory::Boolean) {
        set.insert_mode(AccessMode::GetAndBitwiseAnd);
        set.insert_mode(AccessMode::GetAndBitwiseOr);
        set.insert_mode(AccessMode::GetAndBitwiseXor);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Access;

    const ADD: [Access; 3] = [
        Access::GET_AND_ADD,
        Access::GET_AND_ADD_ACQUIRE,
        Access::GET_AND_ADD_RELEASE,
    ];

    #[test]
    fn test_integral_supports_everything() {
        for ty in [
            ElementType::Byte,
            ElementType::Short,
            ElementType::Char,
            ElementType::Int,
            ElementType::Long,
        ] {
            assert_eq!(supported_accesses(StorageKind::Instance, ty, true), AccessSet::ALL);
        }
    }

    #[test]
    fn test_boolean_has_bitwise_but_no_add() {
        let set = supported_accesses(StorageKind::Static, ElementType::Boolean, true);
        assert!(ADD.iter().all(|a| !set.contains(*a)));
        assert!(set.contains(Access::GET_AND_BITWISE_AND_ACQUIRE));
        assert_eq!(set.len(), Access::COUNT - 3);
    }

    #[test]
    fn test_floating_has_add_but_no_bitwise() {
        let set = supported_accesses(StorageKind::Array, ElementType::Double, false);
        assert!(ADD.iter().all(|a| set.contains(*a)));
        assert!(!set.contains(Access::GET_AND_BITWISE_OR));
        assert_eq!(set.len(), Access::COUNT - 9);
    }

    #[test]
    fn test_reference_has_neither() {
        let set = supported_accesses(StorageKind::Instance, ElementType::String, true);
        assert_eq!(set.len(), Access::COUNT - 12);
        assert!(set.contains(Access::COMPARE_AND_EXCHANGE_RELEASE));
    }

    #[test]
    fn test_final_fields_only_read() {
        for ty in ElementType::PRIMITIVES {
            let set = supported_accesses(StorageKind::Instance, ty, false);
            assert!(set.iter().all(|a| a.mode() == AccessMode::Get));
            assert_eq!(set.len(), 4);
        }
    }
}
