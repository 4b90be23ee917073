//! Access modes, memory orderings and their legality

mod legality;
mod method_type;
mod mode;
mod order;

pub use legality::{supported_accesses, StorageKind};
pub use method_type::{access_type, MethodType};
pub use mode::{Access, AccessMode, AccessSet, AccessShape};
pub use order::MemoryOrder;
