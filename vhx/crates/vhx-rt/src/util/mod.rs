//! Util Module - Shared Utilities
//!
//! Helpers used by the handle layer and the runtime.

pub mod backoff;

pub use backoff::{Backoff, RetryPolicy};
