//! Common types and utilities for vhxt commands.

use std::sync::Arc;

use clap::ValueEnum;
use vhx_rt::class::{Class, FieldDesc};
use vhx_rt::{ClassDesc, ClassLoader, ElementType, VarHandle};

use crate::error::{Result, VhxtError};

// ============================================================================
// Argument Types
// ============================================================================

/// Storage kind selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageArg {
    Static,
    Instance,
    Array,
}

impl StorageArg {
    pub const ALL: [StorageArg; 3] = [StorageArg::Static, StorageArg::Instance, StorageArg::Array];
}

/// Builtin element types, in table order.
pub const BUILTIN_TYPES: [ElementType; 10] = [
    ElementType::Boolean,
    ElementType::Byte,
    ElementType::Short,
    ElementType::Char,
    ElementType::Int,
    ElementType::Long,
    ElementType::Float,
    ElementType::Double,
    ElementType::Object,
    ElementType::String,
];

/// Parse a builtin type name given on the command line.
pub fn parse_type(name: &str) -> Result<ElementType> {
    ElementType::from_name(name).ok_or_else(|| {
        VhxtError::Validation(format!(
            "unknown type: {} (expected one of boolean, byte, short, char, int, long, float, double, Object, String)",
            name
        ))
    })
}

// ============================================================================
// Probe Classes
// ============================================================================

/// Name of the class defined to host probe fields.
pub const PROBE_CLASS: &str = "Probe";

/// A class holding one static and one instance field of a single type.
pub struct ProbeClass {
    pub class: Arc<Class>,
    pub ty: ElementType,
}

impl ProbeClass {
    /// Define `Probe` in `loader` with fields `s` (static) and `i`.
    pub fn define(loader: &Arc<ClassLoader>, ty: ElementType, read_only: bool) -> Result<Self> {
        let type_name = ty.symbol().as_str();
        let mut fields = [
            FieldDesc::new_static("s", type_name),
            FieldDesc::instance("i", type_name),
        ];
        if read_only {
            fields = fields.map(FieldDesc::with_final);
        }
        let class = fields
            .into_iter()
            .fold(ClassDesc::new(PROBE_CLASS), ClassDesc::field);
        Ok(Self {
            class: loader.define_class(class)?,
            ty,
        })
    }

    /// Handle for the probe location of the given storage kind.
    pub fn handle(&self, storage: StorageArg) -> Result<VarHandle> {
        let lookup = self.class.lookup();
        let vh = match storage {
            StorageArg::Static => lookup.find_static_var_handle(&self.class, "s", self.ty)?,
            StorageArg::Instance => lookup.find_var_handle(&self.class, "i", self.ty)?,
            StorageArg::Array => lookup.array_element_var_handle(self.ty),
        };
        Ok(vh)
    }
}
