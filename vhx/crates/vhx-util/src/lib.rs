//! vhx-util - Core Utilities and Foundation Types
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! Foundation types shared by the vhx runtime and its tooling. Today this is
//! the global name interner: every class name, member name and type
//! descriptor the runtime handles is a [`Symbol`].
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. CHEAP IDENTITY
//!    Names compare and hash as a single `u32`. Hot paths such as dispatch
//!    cache shape checks never touch string bytes.
//!
//! 2. THREAD SAFETY
//!    The interner is shared by every thread of the runtime without a global
//!    lock.
//
// ============================================================================
// STRING INTERNING (SYMBOL)
// ============================================================================
//
// Let S be the set of names seen by a runtime and I: S → ℕ the interning
// function. I is injective, so I(s₁) = I(s₂) ⟺ s₁ = s₂ and name equality
// reduces to integer equality.
//
// Well-known names (primitive type names, "Object", "String", "<clinit>")
// are pre-interned at fixed indices so they can be used as constants.

pub mod error;
pub mod symbol;

pub use error::{SymbolError, SymbolResult};
pub use symbol::{InternerStats, Symbol};
