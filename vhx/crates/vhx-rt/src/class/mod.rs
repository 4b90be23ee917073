//! Class Module - classes, loaders and lookups
//!
//! A [`Class`] is defined by exactly one [`ClassLoader`] from a
//! [`ClassDesc`]. It owns its static storage and its initialization gate.
//! Classes keep their loader alive; loaders only hold weak references to the
//! classes they defined.
//!
//! Field resolution and handle creation go through a [`Lookup`], which
//! carries the access rights of its lookup class.

mod desc;
mod init;
mod loader;
mod lookup;

pub use desc::{ClassDesc, ConstValue, FieldDesc, Initializer, StaticAssign};
pub use init::{InitContext, InitState};
pub use loader::ClassLoader;
pub use lookup::Lookup;

use crate::memory::Slot;
use crate::types::{ClassId, ElementType, Value};
use indexmap::IndexMap;
use init::InitGate;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use vhx_util::Symbol;

/// A resolved field
#[derive(Clone, Debug)]
pub struct Field {
    name: Symbol,
    ty: ElementType,
    is_static: bool,
    is_final: bool,
    is_private: bool,
    /// Index into the class statics or the instance layout
    slot: usize,
}

impl Field {
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn ty(&self) -> ElementType {
        self.ty
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

pub(crate) type ClassData = Box<dyn Any + Send + Sync>;

/// A defined class
pub struct Class {
    id: ClassId,
    /// Display name; unique per hidden class
    name: String,
    loader: Arc<ClassLoader>,
    superclass: Option<Arc<Class>>,
    /// Declared fields only, in declaration order
    fields: IndexMap<Symbol, Field>,
    /// Types of every instance slot, inherited fields first
    instance_layout: Box<[ElementType]>,
    statics: Box<[Slot]>,
    /// Static assignments as (static slot, value), applied before the initializer
    static_init: Vec<(usize, Value)>,
    initializer: Option<Initializer>,
    class_data: Mutex<Option<ClassData>>,
    gate: InitGate,
}

impl Class {
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name, with a `/0x<id>` suffix for hidden classes
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defining loader
    pub fn loader(&self) -> &Arc<ClassLoader> {
        &self.loader
    }

    pub fn superclass(&self) -> Option<&Arc<Class>> {
        self.superclass.as_ref()
    }

    /// Hidden classes cannot be found by name
    pub fn is_hidden(&self) -> bool {
        self.id.is_hidden()
    }

    /// Element type of references to this class
    pub fn element_type(&self) -> ElementType {
        ElementType::Class(self.id)
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Declared field by name
    pub fn declared_field(&self, name: Symbol) -> Option<&Field> {
        self.fields.get(&name)
    }

    /// Find a field in this class or its superclasses
    ///
    /// Returns the declaring class together with the field.
    pub fn resolve_field(self: &Arc<Self>, name: Symbol) -> Option<(Arc<Class>, Field)> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(field) = class.fields.get(&name) {
                return Some((Arc::clone(class), field.clone()));
            }
            current = class.superclass.as_ref();
        }
        None
    }

    /// Whether this class is `id` or inherits from it
    pub fn is_subclass_of(&self, id: ClassId) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.id == id {
                return true;
            }
            current = class.superclass.as_deref();
        }
        false
    }

    pub(crate) fn instance_layout(&self) -> &[ElementType] {
        &self.instance_layout
    }

    pub(crate) fn static_slot(&self, index: usize) -> Option<&Slot> {
        self.statics.get(index)
    }

    /// Lookup with full access to this class's members
    pub fn lookup(self: &Arc<Self>) -> Lookup {
        Lookup::new(Arc::clone(self))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("loader", &self.loader.name())
            .field("hidden", &self.is_hidden())
            .field("state", &self.init_state())
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
