//! Method-handle-like adapters over a single access

use super::VarHandle;
use crate::access::{Access, MethodType};
use crate::error::{Result, VhError};
use crate::types::Value;

/// Invokes one [`Access`] on one handle
///
/// Creating an invoker never fails and never initializes the declaring
/// class. Unsupported accesses fail when invoked.
#[derive(Debug, Clone)]
pub struct AccessInvoker {
    handle: VarHandle,
    access: Access,
}

impl AccessInvoker {
    pub(super) fn new(handle: VarHandle, access: Access) -> Self {
        Self { handle, access }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn handle(&self) -> &VarHandle {
        &self.handle
    }

    /// Type of the underlying access: coordinates then values
    pub fn method_type(&self) -> MethodType {
        self.handle.access_mode_type(self.access)
    }

    /// Invoke with a call-site type that must equal the access type
    pub fn invoke_exact(&self, call_type: &MethodType, args: &[Value]) -> Result<Value> {
        let handle = self.handle.with_invoke_exact_behavior();
        let entry = handle.entry(self.access)?;
        if *call_type != entry.method_type {
            return Err(VhError::wrong_method_type(&entry.method_type, call_type));
        }
        handle.invoke_entry(entry, args)
    }

    /// Invoke with primitive widening applied to the arguments
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        self.handle.with_invoke_behavior().access(self.access, args)
    }
}
