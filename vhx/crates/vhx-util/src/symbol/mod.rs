//! Symbol module - String interning for runtime names.
//!
//! This module provides the [`Symbol`] type, a compact (4-byte) handle to an
//! interned string. Class names, member names and type descriptors are
//! interned once and then compared by index.
//!
//! # Thread Safety
//!
//! The interner is fully thread-safe (`Sync + Send`). Multiple threads can
//! intern strings concurrently without blocking each other.
//!
//! # Memory Model
//!
//! Interned strings are allocated on the heap with `'static` lifetime and are
//! never deallocated. The set of names a runtime sees is bounded by the
//! classes it defines, so this is acceptable.
//!
//! # Examples
//!
//! ```
//! use vhx_util::symbol::{Symbol, SYM_INT};
//!
//! let s1 = Symbol::intern("counter");
//! let s2 = Symbol::intern("counter");
//! assert_eq!(s1, s2);
//!
//! assert_eq!(Symbol::intern("int"), SYM_INT);
//! assert!(SYM_INT.is_known());
//! ```

mod interner;

pub use interner::STRING_TABLE;

/// Statistics about the string interner for profiling
#[derive(Clone, Copy, Debug, Default)]
pub struct InternerStats {
    /// Number of interned strings
    pub count: usize,
    /// Number of cache hits (string already interned)
    pub hits: usize,
    /// Number of cache misses (new string allocation)
    pub misses: usize,
}

impl InternerStats {
    /// Calculate the hit rate (hits / total operations)
    ///
    /// Returns 0.0 if no operations have been performed.
    ///
    /// ```
    /// use vhx_util::symbol::InternerStats;
    ///
    /// let stats = InternerStats { count: 10, hits: 75, misses: 25 };
    /// assert_eq!(stats.hit_rate(), 0.75);
    /// ```
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Symbol - an interned string
///
/// Comparison and hashing are O(1) index operations.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    /// Index into the global string table
    pub(crate) index: u32,
}

// ============================================================================
// KNOWN SYMBOLS
// ============================================================================

/// Well-known names, pre-interned at these exact indices.
pub(crate) const KNOWN_SYMBOLS: [&str; 13] = [
    "void", "boolean", "byte", "short", "char", "int", "long", "float", "double", "Object",
    "String", "<clinit>", "<init>",
];

/// Known symbol for `void`
pub const SYM_VOID: Symbol = Symbol { index: 0 };
/// Known symbol for `boolean`
pub const SYM_BOOLEAN: Symbol = Symbol { index: 1 };
/// Known symbol for `byte`
pub const SYM_BYTE: Symbol = Symbol { index: 2 };
/// Known symbol for `short`
pub const SYM_SHORT: Symbol = Symbol { index: 3 };
/// Known symbol for `char`
pub const SYM_CHAR: Symbol = Symbol { index: 4 };
/// Known symbol for `int`
pub const SYM_INT: Symbol = Symbol { index: 5 };
/// Known symbol for `long`
pub const SYM_LONG: Symbol = Symbol { index: 6 };
/// Known symbol for `float`
pub const SYM_FLOAT: Symbol = Symbol { index: 7 };
/// Known symbol for `double`
pub const SYM_DOUBLE: Symbol = Symbol { index: 8 };
/// Known symbol for the root reference type
pub const SYM_OBJECT: Symbol = Symbol { index: 9 };
/// Known symbol for the string type
pub const SYM_STRING: Symbol = Symbol { index: 10 };
/// Known symbol for the class initializer
pub const SYM_CLINIT: Symbol = Symbol { index: 11 };
/// Known symbol for instance constructors
pub const SYM_INIT: Symbol = Symbol { index: 12 };

impl Symbol {
    /// Intern a string, returning its symbol
    ///
    /// ```
    /// use vhx_util::symbol::Symbol;
    ///
    /// let name = Symbol::intern("value");
    /// assert_eq!(Symbol::intern("value"), name);
    /// ```
    #[inline]
    pub fn intern(string: &str) -> Self {
        STRING_TABLE.intern(string)
    }

    /// Look up an already interned string without interning it
    #[inline]
    pub fn lookup(string: &str) -> Option<Self> {
        STRING_TABLE.lookup(string)
    }

    /// Get the string value associated with this symbol
    ///
    /// Returns an empty string for a symbol not produced by the interner.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        STRING_TABLE.get(*self).unwrap_or("")
    }

    /// Compare against a string without interning it
    #[inline]
    pub fn eq_str(&self, other: &str) -> bool {
        self.as_str() == other
    }

    /// Whether this is one of the pre-interned well-known names
    #[inline]
    pub fn is_known(&self) -> bool {
        (self.index as usize) < KNOWN_SYMBOLS.len()
    }

    /// Raw index, stable for the lifetime of the process
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.index
    }

    /// Interner statistics
    pub fn stats() -> InternerStats {
        STRING_TABLE.stats()
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::intern(value)
    }
}

// Ensure Symbol is thread-safe
static_assertions::assert_impl_all!(Symbol: Send, Sync, Copy);
