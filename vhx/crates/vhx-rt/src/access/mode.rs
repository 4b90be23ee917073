//! Access mode registry
//!
//! An [`AccessMode`] is a kind of operation; an [`Access`] is a legal pairing
//! of a mode with a [`MemoryOrder`]. There are exactly 31 accesses, numbered
//! in a fixed order so they can index dispatch tables and bitsets.

use super::order::MemoryOrder;
use serde::{Serialize, Serializer};
use std::fmt;

/// Kind of read, write or update operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    Get,
    Set,
    GetAndSet,
    CompareAndSet,
    CompareAndExchange,
    GetAndAdd,
    GetAndBitwiseAnd,
    GetAndBitwiseOr,
    GetAndBitwiseXor,
    WeakCompareAndSet,
}

/// Shape of an access method type, shared by several modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessShape {
    /// `(coords) -> T`
    Read,
    /// `(coords, T) -> void`
    Write,
    /// `(coords, T, T) -> boolean`
    CompareAndSet,
    /// `(coords, T, T) -> T`
    CompareAndExchange,
    /// `(coords, T) -> T`
    GetAndUpdate,
}

impl AccessMode {
    pub const ALL: [AccessMode; 10] = [
        AccessMode::Get,
        AccessMode::Set,
        AccessMode::GetAndSet,
        AccessMode::CompareAndSet,
        AccessMode::CompareAndExchange,
        AccessMode::GetAndAdd,
        AccessMode::GetAndBitwiseAnd,
        AccessMode::GetAndBitwiseOr,
        AccessMode::GetAndBitwiseXor,
        AccessMode::WeakCompareAndSet,
    ];

    pub fn shape(self) -> AccessShape {
        match self {
            AccessMode::Get => AccessShape::Read,
            AccessMode::Set => AccessShape::Write,
            AccessMode::CompareAndSet | AccessMode::WeakCompareAndSet => {
                AccessShape::CompareAndSet
            },
            AccessMode::CompareAndExchange => AccessShape::CompareAndExchange,
            AccessMode::GetAndSet
            | AccessMode::GetAndAdd
            | AccessMode::GetAndBitwiseAnd
            | AccessMode::GetAndBitwiseOr
            | AccessMode::GetAndBitwiseXor => AccessShape::GetAndUpdate,
        }
    }

    /// Whether the mode writes storage
    pub fn is_write(self) -> bool {
        self != AccessMode::Get
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            AccessMode::GetAndBitwiseAnd | AccessMode::GetAndBitwiseOr | AccessMode::GetAndBitwiseXor
        )
    }

    /// Legal orderings of this mode
    pub fn orders(self) -> impl Iterator<Item = MemoryOrder> {
        Access::ALL
            .into_iter()
            .filter(move |access| access.mode() == self)
            .map(|access| access.order())
    }
}

/// A legal (AccessMode, MemoryOrder) pair
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Access {
    ordinal: u8,
}

struct AccessInfo {
    mode: AccessMode,
    order: MemoryOrder,
    name: &'static str,
}

macro_rules! accesses {
    ($($idx:literal $konst:ident $name:literal => $mode:ident $order:ident;)*) => {
        const ACCESS_INFO: [AccessInfo; 31] = [
            $(AccessInfo {
                mode: AccessMode::$mode,
                order: MemoryOrder::$order,
                name: $name,
            },)*
        ];

        impl Access {
            $(
                #[doc = concat!("`", $name, "`")]
                pub const $konst: Access = Access { ordinal: $idx };
            )*

            /// Every access, in ordinal order
            pub const ALL: [Access; 31] = [$(Access::$konst,)*];
        }
    };
}

accesses! {
    0 GET "get" => Get Plain;
    1 SET "set" => Set Plain;
    2 GET_VOLATILE "getVolatile" => Get Volatile;
    3 SET_VOLATILE "setVolatile" => Set Volatile;
    4 GET_ACQUIRE "getAcquire" => Get Acquire;
    5 SET_RELEASE "setRelease" => Set Release;
    6 GET_OPAQUE "getOpaque" => Get Opaque;
    7 SET_OPAQUE "setOpaque" => Set Opaque;
    8 COMPARE_AND_SET "compareAndSet" => CompareAndSet Volatile;
    9 COMPARE_AND_EXCHANGE "compareAndExchange" => CompareAndExchange Volatile;
    10 COMPARE_AND_EXCHANGE_ACQUIRE "compareAndExchangeAcquire" => CompareAndExchange Acquire;
    11 COMPARE_AND_EXCHANGE_RELEASE "compareAndExchangeRelease" => CompareAndExchange Release;
    12 WEAK_COMPARE_AND_SET_PLAIN "weakCompareAndSetPlain" => WeakCompareAndSet Plain;
    13 WEAK_COMPARE_AND_SET "weakCompareAndSet" => WeakCompareAndSet Volatile;
    14 WEAK_COMPARE_AND_SET_ACQUIRE "weakCompareAndSetAcquire" => WeakCompareAndSet Acquire;
    15 WEAK_COMPARE_AND_SET_RELEASE "weakCompareAndSetRelease" => WeakCompareAndSet Release;
    16 GET_AND_SET "getAndSet" => GetAndSet Volatile;
    17 GET_AND_SET_ACQUIRE "getAndSetAcquire" => GetAndSet Acquire;
    18 GET_AND_SET_RELEASE "getAndSetRelease" => GetAndSet Release;
    19 GET_AND_ADD "getAndAdd" => GetAndAdd Volatile;
    20 GET_AND_ADD_ACQUIRE "getAndAddAcquire" => GetAndAdd Acquire;
    21 GET_AND_ADD_RELEASE "getAndAddRelease" => GetAndAdd Release;
    22 GET_AND_BITWISE_OR "getAndBitwiseOr" => GetAndBitwiseOr Volatile;
    23 GET_AND_BITWISE_OR_RELEASE "getAndBitwiseOrRelease" => GetAndBitwiseOr Release;
    24 GET_AND_BITWISE_OR_ACQUIRE "getAndBitwiseOrAcquire" => GetAndBitwiseOr Acquire;
    25 GET_AND_BITWISE_AND "getAndBitwiseAnd" => GetAndBitwiseAnd Volatile;
    26 GET_AND_BITWISE_AND_RELEASE "getAndBitwiseAndRelease" => GetAndBitwiseAnd Release;
    27 GET_AND_BITWISE_AND_ACQUIRE "getAndBitwiseAndAcquire" => GetAndBitwiseAnd Acquire;
    28 GET_AND_BITWISE_XOR "getAndBitwiseXor" => GetAndBitwiseXor Volatile;
    29 GET_AND_BITWISE_XOR_RELEASE "getAndBitwiseXorRelease" => GetAndBitwiseXor Release;
    30 GET_AND_BITWISE_XOR_ACQUIRE "getAndBitwiseXorAcquire" => GetAndBitwiseXor Acquire;
}

impl Access {
    /// Number of distinct accesses
    pub const COUNT: usize = 31;

    #[inline]
    fn info(self) -> &'static AccessInfo {
        &ACCESS_INFO[self.ordinal as usize]
    }

    /// Pair a mode with an ordering, `None` if the pair is not legal
    ///
    /// ```
    /// use vhx_rt::access::{Access, AccessMode, MemoryOrder};
    ///
    /// assert_eq!(
    ///     Access::of(AccessMode::Get, MemoryOrder::Acquire),
    ///     Some(Access::GET_ACQUIRE)
    /// );
    /// assert_eq!(Access::of(AccessMode::Set, MemoryOrder::Acquire), None);
    /// ```
    pub fn of(mode: AccessMode, order: MemoryOrder) -> Option<Access> {
        Access::ALL
            .into_iter()
            .find(|access| access.mode() == mode && access.order() == order)
    }

    /// Look up an access by its method name, e.g. `"getAndAddRelease"`
    pub fn from_name(name: &str) -> Option<Access> {
        Access::ALL.into_iter().find(|access| access.name() == name)
    }

    #[inline]
    pub fn ordinal(self) -> usize {
        self.ordinal as usize
    }

    #[inline]
    pub fn mode(self) -> AccessMode {
        self.info().mode
    }

    #[inline]
    pub fn order(self) -> MemoryOrder {
        self.info().order
    }

    /// Method name of the access
    #[inline]
    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Access({})", self.name())
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Access {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Set of accesses, one bit per ordinal
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessSet(u32);

impl AccessSet {
    pub const EMPTY: AccessSet = AccessSet(0);
    pub const ALL: AccessSet = AccessSet((1 << Access::COUNT) - 1);

    #[inline]
    pub fn contains(&self, access: Access) -> bool {
        self.0 & (1 << access.ordinal) != 0
    }

    #[inline]
    pub fn insert(&mut self, access: Access) {
        self.0 |= 1 << access.ordinal;
    }

    /// Add every legal ordering of `mode`
    pub fn insert_mode(&mut self, mode: AccessMode) {
        for access in Access::ALL.into_iter().filter(|a| a.mode() == mode) {
            self.insert(access);
        }
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Accesses in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = Access> + '_ {
        Access::ALL.into_iter().filter(|access| self.contains(*access))
    }

    pub fn difference(&self, other: &AccessSet) -> AccessSet {
        AccessSet(self.0 & !other.0)
    }
}

impl FromIterator<Access> for AccessSet {
    fn from_iter<I: IntoIterator<Item = Access>>(iter: I) -> Self {
        let mut set = AccessSet::EMPTY;
        for access in iter {
            set.insert(access);
        }
        set
    }
}

impl fmt::Debug for AccessSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Access::name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ordinals_are_dense() {
        for (idx, access) in Access::ALL.iter().enumerate() {
            assert_eq!(access.ordinal(), idx);
        }
    }

    #[test]
    fn test_names_unique_and_resolvable() {
        let names: HashSet<_> = Access::ALL.iter().map(|a| a.name()).collect();
        assert_eq!(names.len(), Access::COUNT);
        for access in Access::ALL {
            assert_eq!(Access::from_name(access.name()), Some(access));
        }
        assert_eq!(Access::from_name("getAndMultiply"), None);
    }

    #[test]
    fn test_reads_never_release_writes_never_acquire() {
        for access in Access::ALL {
            match access.mode() {
                AccessMode::Get => assert!(access.order().is_read_order()),
                AccessMode::Set => assert!(access.order().is_write_order()),
                _ => {},
            }
        }
    }

    #[test]
    fn test_mode_order_counts() {
        assert_eq!(AccessMode::Get.orders().count(), 4);
        assert_eq!(AccessMode::CompareAndSet.orders().count(), 1);
        assert_eq!(AccessMode::WeakCompareAndSet.orders().count(), 4);
        assert_eq!(AccessMode::GetAndBitwiseXor.orders().count(), 3);
    }

    #[test]
    fn test_access_set_operations() {
        let mut set = AccessSet::EMPTY;
        set.insert_mode(AccessMode::Get);
        assert_eq!(set.len(), 4);
        assert!(set.contains(Access::GET_OPAQUE));
        assert!(!set.contains(Access::SET));
        assert_eq!(AccessSet::ALL.difference(&set).len(), Access::COUNT - 4);
    }
}
