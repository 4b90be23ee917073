//! # vhx-rt - Variable Handles for a Managed Runtime
//!
//! vhx-rt gives typed, ordering-aware access to the storage of a small
//! managed object model: static fields, instance fields and array cells.
//!
//! ## Overview
//!
//! - **Access registry**: 31 (mode, ordering) pairs with fixed names and
//!   ordinals, and the legality rules that pick the subset a location supports
//! - **Ordering engine**: plain, opaque, acquire, release and volatile
//!   orderings mapped onto hardware atomics
//! - **Handles**: a [`VarHandle`] bound to one location, checking every
//!   argument before memory is touched
//! - **Class initialization**: a per-class gate that runs the initializer
//!   exactly once, on first observable use
//! - **Dispatch sites**: bounded, lock-free caches for call sites that see
//!   many handles
//!
//! ## Quick Start
//!
//! ```rust
//! use vhx_rt::class::{ClassDesc, ConstValue, FieldDesc};
//! use vhx_rt::{ElementType, Value};
//!
//! fn main() -> Result<(), vhx_rt::VhError> {
//!     let runtime = vhx_rt::init()?;
//!     let loader = runtime.new_loader("app");
//!
//!     let counter = loader.define_class(
//!         ClassDesc::new("Counter")
//!             .field(FieldDesc::new_static("count", "int"))
//!             .assign("count", ConstValue::Int(10)),
//!     )?;
//!
//!     let count = counter
//!         .lookup()
//!         .find_static_var_handle(&counter, "count", ElementType::Int)?;
//!
//!     // Metadata never initializes the class.
//!     assert!(count.is_access_mode_supported(vhx_rt::Access::GET_AND_ADD));
//!     assert!(!counter.is_initialized());
//!
//!     // The first access does.
//!     assert_eq!(count.get_and_add(&[Value::Int(1)])?, Value::Int(10));
//!     assert!(counter.is_initialized());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  AccessSite  (hash(handle id) → immutable cached entry)  │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ hit or miss
//! ┌────────────────────────────▼─────────────────────────────┐
//! │  VarHandle                                               │
//! │   supported? → arity → coordinates → values → bounds     │
//! │   → init gate (static only) → AccessTable entry          │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ MemoryOrder → atomic::Ordering
//! ┌────────────────────────────▼─────────────────────────────┐
//! │  Slot: AtomicU64 bits  |  epoch-managed reference cell    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Thread Safety
//!
//! - Handles, classes, loaders and sites are `Send + Sync`
//! - The handle layer takes no locks; compare-and-set and exchange are the
//!   only serialization points
//! - Threads block only in the initialization gate, while another thread
//!   runs the initializer
//!
//! ## Modules
//!
//! - [`access`]: access modes, orderings, legality and method types
//! - [`class`]: classes, loaders, lookups and the initialization gate
//! - [`config`]: runtime configuration and validation
//! - [`error`]: error types
//! - [`handle`]: variable handles, invokers and the typed facade
//! - [`logging`]: structured runtime events
//! - [`object`]: instances, arrays and references
//! - [`runtime`]: configured entry point and the reclamation probe
//! - [`site`]: polymorphic dispatch caches
//! - [`types`]: element types and values
//! - [`util`]: retry and backoff helpers

// Core
pub mod config;
pub mod error;
pub mod logging;

// Object model
pub mod class;
pub mod object;
pub mod types;

// Access machinery
pub mod access;
pub mod handle;
pub(crate) mod memory;
pub mod site;

// Runtime
pub mod runtime;
pub mod util;

// Re-export main types for convenience
pub use access::{Access, AccessMode, MemoryOrder};
pub use class::{ClassDesc, ClassLoader, Lookup};
pub use config::VhConfig;
pub use error::{Result, VhError};
pub use handle::VarHandle;
pub use runtime::Runtime;
pub use site::AccessSite;
pub use types::{ElementType, Value};

/// vhx-rt version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize with the default configuration
///
/// ```rust
/// let runtime = vhx_rt::init()?;
/// assert_eq!(runtime.config().site_cache_capacity, 4);
/// # Ok::<(), vhx_rt::VhError>(())
/// ```
pub fn init() -> Result<Runtime> {
    init_with_config(VhConfig::default())
}

/// Initialize with a custom configuration
///
/// Validates the configuration and applies its event logging switches to
/// the global event logger.
pub fn init_with_config(config: VhConfig) -> Result<Runtime> {
    config.validate()?;

    if config.verbose {
        logging::configure_logger(logging::EventLoggerConfig {
            console: true,
            ..Default::default()
        });
    }
    logging::set_logging_enabled(config.events);

    Runtime::new(config)
}
