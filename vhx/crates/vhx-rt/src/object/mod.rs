//! Object Module - heap objects and references
//!
//! Objects are reference counted. A reference is one of:
//! - a string (`Arc<str>`)
//! - an instance of a class, with one slot per instance field
//! - an array, with one slot per cell
//!
//! Reference equality is identity: two references are equal only when they
//! point at the same allocation.
//!
//! Instances refer to their class weakly and carry the ids of its ancestry.
//! No object graph therefore holds a class, and through it a loader, alive:
//! a singleton stored in its own class's static field, or any cycle of
//! instances, never prevents the loader from being reclaimed. Cycles among
//! instances themselves are reference counted and are not collected.

use crate::class::Class;
use crate::error::Result;
use crate::memory::Slot;
use crate::types::{ClassId, ElementType, Value, ValueType};
use std::fmt;
use std::sync::{Arc, Weak};

/// A non-null reference
#[derive(Clone)]
pub enum ObjectRef {
    Str(Arc<str>),
    Instance(Arc<Instance>),
    Array(Arc<ArrayObject>),
}

impl ObjectRef {
    /// Allocate a new string
    pub fn string(s: &str) -> Self {
        ObjectRef::Str(Arc::from(s))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        match (self, other) {
            (ObjectRef::Str(a), ObjectRef::Str(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Instance(a), ObjectRef::Instance(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Array(a), ObjectRef::Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Runtime type of the referenced object
    pub fn value_type(&self) -> ValueType {
        match self {
            ObjectRef::Str(_) => ValueType::Element(ElementType::String),
            ObjectRef::Instance(obj) => ValueType::Element(ElementType::Class(obj.class_id())),
            ObjectRef::Array(arr) => ValueType::ArrayOf(arr.component),
        }
    }

    /// Whether the object can be stored in a location of type `ty`
    pub fn is_assignable_to(&self, ty: ElementType) -> bool {
        match (ty, self) {
            (ElementType::Object, _) => true,
            (ElementType::String, ObjectRef::Str(_)) => true,
            (ElementType::Class(id), ObjectRef::Instance(obj)) => obj.is_instance_of(id),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObjectRef::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            ObjectRef::Instance(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Arc<ArrayObject>> {
        match self {
            ObjectRef::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Str(s) => write!(f, "{:?}", s),
            ObjectRef::Instance(obj) => write!(f, "{}@{:p}", obj.class_id(), Arc::as_ptr(obj)),
            ObjectRef::Array(arr) => write!(f, "{}[{}]", arr.component, arr.len()),
        }
    }
}

impl From<Arc<Instance>> for ObjectRef {
    fn from(obj: Arc<Instance>) -> Self {
        ObjectRef::Instance(obj)
    }
}

impl From<Arc<ArrayObject>> for ObjectRef {
    fn from(arr: Arc<ArrayObject>) -> Self {
        ObjectRef::Array(arr)
    }
}

/// An instance of a class
///
/// Slots follow the class's instance layout: inherited fields first.
pub struct Instance {
    class: Weak<Class>,
    id: ClassId,
    /// Ids of the class and its superclasses
    ancestry: Box<[ClassId]>,
    fields: Box<[Slot]>,
}

impl Instance {
    /// Allocate an instance, initializing the class first
    pub fn new(class: &Arc<Class>) -> Result<Arc<Instance>> {
        class.ensure_initialized()?;
        let fields = class.instance_layout().iter().map(|ty| Slot::new(*ty)).collect();
        let mut ancestry = Vec::new();
        let mut current = Some(&**class);
        while let Some(c) = current {
            ancestry.push(c.id());
            current = c.superclass().map(|sup| &**sup);
        }
        Ok(Arc::new(Instance {
            class: Arc::downgrade(class),
            id: class.id(),
            ancestry: ancestry.into_boxed_slice(),
            fields,
        }))
    }

    /// The instance's class, `None` once nothing else holds it
    pub fn class(&self) -> Option<Arc<Class>> {
        self.class.upgrade()
    }

    pub fn class_id(&self) -> ClassId {
        self.id
    }

    /// Whether the instance's class is `id` or inherits from it
    pub fn is_instance_of(&self, id: ClassId) -> bool {
        self.ancestry.contains(&id)
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Slot> {
        self.fields.get(index)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class_id())
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// A fixed-length array
pub struct ArrayObject {
    component: ElementType,
    cells: Box<[Slot]>,
}

impl ArrayObject {
    /// Allocate an array with every cell at its default value
    pub fn new(component: ElementType, len: usize) -> Arc<ArrayObject> {
        Arc::new(ArrayObject {
            component,
            cells: (0..len).map(|_| Slot::new(component)).collect(),
        })
    }

    /// Allocate an array holding `values`
    ///
    /// Values that do not fit the component type are rejected.
    pub fn from_values(component: ElementType, values: &[Value]) -> Result<Arc<ArrayObject>> {
        let cells = values
            .iter()
            .map(|value| {
                let value = crate::handle::check_value(value, component, false)?;
                Ok(Slot::with_value(component, &value))
            })
            .collect::<Result<Box<[Slot]>>>()?;
        Ok(Arc::new(ArrayObject { component, cells }))
    }

    pub fn component(&self) -> ElementType {
        self.component
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn cell(&self, index: usize) -> Option<&Slot> {
        self.cells.get(index)
    }
}

impl fmt::Debug for ArrayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayObject({}[{}])", self.component, self.cells.len())
    }
}
