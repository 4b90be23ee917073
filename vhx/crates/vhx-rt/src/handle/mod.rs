//! Handle Module - typed, mode-dispatching accessors
//!
//! A [`VarHandle`] is bound to exactly one storage location: a static field,
//! an instance field, or the cells of arrays of one component type. It
//! exposes every legal (access mode × ordering) combination for that
//! location through a dispatch table fixed at construction.
//!
//! Every invocation checks its arguments before touching memory, in this
//! order:
//!
//! 1. the access is supported (`UnsupportedOperation`)
//! 2. the argument count matches (`WrongMethodType`)
//! 3. coordinates: receiver or array (`NullReceiver`, `ClassCast`) and
//!    index type (`WrongType`)
//! 4. value arguments have exactly the variable type (`WrongType`, or
//!    `ClassCast` for references)
//! 5. the array index is in bounds (`IndexOutOfRange`)
//! 6. the declaring class of a static field is initialized
//!
//! A rejected call therefore never mutates storage and never triggers
//! class initialization.

mod invoker;
mod table;
mod typed;

pub use invoker::AccessInvoker;
pub use typed::{HandleValue, TypedHandle};

pub(crate) use table::AccessEntry;

use crate::access::{
    access_type, supported_accesses, Access, AccessMode, AccessSet, MemoryOrder, MethodType,
    StorageKind,
};
use crate::class::{Class, Field};
use crate::ensure;
use crate::error::{Result, VhError};
use crate::object::{ArrayObject, Instance, ObjectRef};
use crate::types::{ClassId, ElementType, Value, ValueType};
use crate::util::RetryPolicy;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use table::AccessTable;
use vhx_util::Symbol;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle identity, never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// How value arguments are matched against the variable type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokeBehavior {
    /// Value arguments must have exactly the variable type
    #[default]
    Exact,
    /// Primitive widening conversions are applied to values and the index
    Tolerant,
}

pub(crate) enum Location {
    Static {
        class: Arc<Class>,
        field: Symbol,
        slot: usize,
    },
    Instance {
        class: Arc<Class>,
        field: Symbol,
        slot: usize,
    },
    Array,
}

/// Identity-free description of a location, compared by dispatch caches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct LocationShape {
    pub kind: StorageKind,
    pub declaring: Option<ClassId>,
    pub slot: usize,
    pub var_type: ElementType,
}

pub(crate) struct HandleInner {
    id: HandleId,
    location: Location,
    var_type: ElementType,
    writable: bool,
    supported: AccessSet,
    coords: Vec<ValueType>,
    table: AccessTable,
}

/// A typed, mode-dispatching accessor bound to one storage location
///
/// Cloning is cheap and preserves identity.
///
/// # Examples
///
/// ```
/// use vhx_rt::class::{ClassDesc, ClassLoader, FieldDesc};
/// use vhx_rt::types::{ElementType, Value};
///
/// let loader = ClassLoader::new("doc", None);
/// let class = loader
///     .define_class(ClassDesc::new("DocCounter").field(FieldDesc::new_static("hits", "int")))
///     .unwrap();
/// let vh = class
///     .lookup()
///     .find_static_var_handle(&class, "hits", ElementType::Int)
///     .unwrap();
///
/// vh.set_release(&[Value::Int(41)]).unwrap();
/// assert_eq!(vh.get_and_add(&[Value::Int(1)]).unwrap(), Value::Int(41));
/// assert_eq!(vh.get_acquire(&[]).unwrap(), Value::Int(42));
/// ```
#[derive(Clone)]
pub struct VarHandle {
    inner: Arc<HandleInner>,
    behavior: InvokeBehavior,
}

enum Target<'a> {
    Static(&'a Arc<Class>, usize),
    Field(Arc<Instance>, usize),
    Cell(Arc<ArrayObject>, i32),
}

impl VarHandle {
    fn build(location: Location, var_type: ElementType, writable: bool) -> Self {
        let (kind, coords) = match &location {
            Location::Static { .. } => (StorageKind::Static, Vec::new()),
            Location::Instance { class, .. } => {
                (StorageKind::Instance, vec![ValueType::Element(class.element_type())])
            },
            Location::Array => (
                StorageKind::Array,
                vec![ValueType::ArrayOf(var_type), ValueType::INT],
            ),
        };
        let supported = supported_accesses(kind, var_type, writable);
        let table = AccessTable::build(supported, &coords, var_type);

        VarHandle {
            inner: Arc::new(HandleInner {
                id: HandleId::next(),
                location,
                var_type,
                writable: writable || kind == StorageKind::Array,
                supported,
                coords,
                table,
            }),
            behavior: InvokeBehavior::Exact,
        }
    }

    pub(crate) fn for_static(class: Arc<Class>, field: &Field) -> Self {
        let location = Location::Static {
            class,
            field: field.name(),
            slot: field.slot(),
        };
        Self::build(location, field.ty(), !field.is_final())
    }

    pub(crate) fn for_instance(class: Arc<Class>, field: &Field) -> Self {
        let location = Location::Instance {
            class,
            field: field.name(),
            slot: field.slot(),
        };
        Self::build(location, field.ty(), !field.is_final())
    }

    pub(crate) fn for_array(component: ElementType) -> Self {
        Self::build(Location::Array, component, true)
    }

    // ------------------------------------------------------------------
    // Metadata. None of these trigger class initialization.
    // ------------------------------------------------------------------

    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self.inner.location {
            Location::Static { .. } => StorageKind::Static,
            Location::Instance { .. } => StorageKind::Instance,
            Location::Array => StorageKind::Array,
        }
    }

    /// Type of the variable
    pub fn var_type(&self) -> ElementType {
        self.inner.var_type
    }

    /// Coordinate types: `()`, `(Receiver)` or `(T[], int)`
    pub fn coordinate_types(&self) -> &[ValueType] {
        &self.inner.coords
    }

    /// Exact method type of `access`, whether or not it is supported
    pub fn access_mode_type(&self, access: Access) -> MethodType {
        match self.inner.table.get(access) {
            Some(entry) => entry.method_type.clone(),
            None => access_type(access, &self.inner.coords, self.inner.var_type),
        }
    }

    pub fn is_access_mode_supported(&self, access: Access) -> bool {
        self.inner.supported.contains(access)
    }

    pub fn supported_accesses(&self) -> AccessSet {
        self.inner.supported
    }

    pub fn is_writable(&self) -> bool {
        self.inner.writable
    }

    /// Class declaring the field, `None` for array handles
    pub fn declaring_class(&self) -> Option<&Arc<Class>> {
        match &self.inner.location {
            Location::Static { class, .. } | Location::Instance { class, .. } => Some(class),
            Location::Array => None,
        }
    }

    pub fn field_name(&self) -> Option<Symbol> {
        match &self.inner.location {
            Location::Static { field, .. } | Location::Instance { field, .. } => Some(*field),
            Location::Array => None,
        }
    }

    pub fn behavior(&self) -> InvokeBehavior {
        self.behavior
    }

    pub fn has_invoke_exact_behavior(&self) -> bool {
        self.behavior == InvokeBehavior::Exact
    }

    /// Same location, value arguments matched exactly
    pub fn with_invoke_exact_behavior(&self) -> VarHandle {
        VarHandle {
            inner: Arc::clone(&self.inner),
            behavior: InvokeBehavior::Exact,
        }
    }

    /// Same location, primitive widening applied to arguments
    pub fn with_invoke_behavior(&self) -> VarHandle {
        VarHandle {
            inner: Arc::clone(&self.inner),
            behavior: InvokeBehavior::Tolerant,
        }
    }

    /// Serializable summary of the handle
    pub fn describe(&self) -> VarHandleDesc {
        VarHandleDesc {
            id: self.inner.id,
            storage: self.storage_kind(),
            declaring_class: self.declaring_class().map(|c| c.name().to_string()),
            field: self.field_name().map(|f| f.to_string()),
            var_type: self.inner.var_type.to_string(),
            coordinates: self.inner.coords.iter().map(ToString::to_string).collect(),
            writable: self.inner.writable,
            behavior: self.behavior,
            accesses: self
                .inner
                .supported
                .iter()
                .map(|access| AccessDesc {
                    access,
                    order: access.order(),
                    method_type: self.access_mode_type(access).to_string(),
                })
                .collect(),
        }
    }

    /// Adapter invoking `access` on this handle
    ///
    /// Never fails and never initializes; unsupported accesses fail when
    /// the adapter is invoked.
    pub fn to_method_handle(&self, access: Access) -> AccessInvoker {
        AccessInvoker::new(self.clone(), access)
    }

    // ------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------

    /// Invoke `access` with coordinates followed by value arguments
    pub fn access(&self, access: Access, args: &[Value]) -> Result<Value> {
        let entry = self.entry(access)?;
        self.invoke_entry(entry, args)
    }

    pub(crate) fn entry(&self, access: Access) -> Result<&AccessEntry> {
        self.inner
            .table
            .get(access)
            .ok_or_else(|| VhError::UnsupportedOperation {
                access: access.name().to_string(),
                location: self.location_name(),
            })
    }

    /// Run a table entry for this handle, performing every check
    pub(crate) fn invoke_entry(&self, entry: &AccessEntry, args: &[Value]) -> Result<Value> {
        let inner = &*self.inner;
        let tolerant = self.behavior == InvokeBehavior::Tolerant;

        ensure!(
            args.len() == entry.method_type.param_count(),
            VhError::wrong_method_type(&entry.method_type, describe_args(args))
        );

        let (coords, values) = args.split_at(inner.coords.len());
        let target = self.resolve_target(coords, tolerant)?;

        let mut checked = [Value::Void, Value::Void];
        for (out, value) in checked.iter_mut().zip(values) {
            *out = check_value(value, inner.var_type, tolerant)?;
        }
        let checked = &checked[..values.len()];

        match target {
            Target::Static(class, slot) => {
                class.ensure_initialized()?;
                let slot = class.static_slot(slot).ok_or_else(|| self.missing_slot())?;
                Ok(entry.run(slot, inner.var_type, checked))
            },
            Target::Field(obj, slot) => {
                let slot = obj.slot(slot).ok_or_else(|| self.missing_slot())?;
                Ok(entry.run(slot, inner.var_type, checked))
            },
            Target::Cell(array, index) => {
                let cell = usize::try_from(index)
                    .ok()
                    .and_then(|i| array.cell(i))
                    .ok_or(VhError::IndexOutOfRange {
                        index: index as i64,
                        length: array.len(),
                    })?;
                Ok(entry.run(cell, inner.var_type, checked))
            },
        }
    }

    fn resolve_target(&self, coords: &[Value], tolerant: bool) -> Result<Target<'_>> {
        match &self.inner.location {
            Location::Static { class, slot, .. } => Ok(Target::Static(class, *slot)),
            Location::Instance { class, slot, .. } => match &coords[0] {
                Value::Null => Err(VhError::NullReceiver {
                    location: self.location_name(),
                }),
                Value::Ref(ObjectRef::Instance(obj)) if obj.is_instance_of(class.id()) => {
                    Ok(Target::Field(Arc::clone(obj), *slot))
                },
                other @ Value::Ref(_) => Err(VhError::class_cast(class.name(), other.type_name())),
                other => Err(VhError::wrong_type(class.name(), other.type_name())),
            },
            Location::Array => {
                let expected = ValueType::ArrayOf(self.inner.var_type);
                let array = match &coords[0] {
                    Value::Null => {
                        return Err(VhError::NullReceiver {
                            location: self.location_name(),
                        })
                    },
                    Value::Ref(ObjectRef::Array(array))
                        if array.component() == self.inner.var_type =>
                    {
                        Arc::clone(array)
                    },
                    other @ Value::Ref(_) => {
                        return Err(VhError::class_cast(expected, other.type_name()))
                    },
                    other => return Err(VhError::wrong_type(expected, other.type_name())),
                };
                let index = match &coords[1] {
                    Value::Int(index) => *index,
                    other if tolerant => other
                        .widen_to(ElementType::Int)
                        .and_then(|v| v.as_i32())
                        .ok_or_else(|| VhError::wrong_type(ElementType::Int, other.type_name()))?,
                    other => return Err(VhError::wrong_type(ElementType::Int, other.type_name())),
                };
                Ok(Target::Cell(array, index))
            },
        }
    }

    fn missing_slot(&self) -> VhError {
        VhError::NoSuchField {
            class: self
                .declaring_class()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            name: self.field_name().map(|f| f.to_string()).unwrap_or_default(),
        }
    }

    fn location_name(&self) -> String {
        let ty = self.inner.var_type;
        match &self.inner.location {
            Location::Static { class, field, .. } => format!("static {}.{}:{}", class.name(), field, ty),
            Location::Instance { class, field, .. } => format!("{}.{}:{}", class.name(), field, ty),
            Location::Array => format!("{}[]", ty),
        }
    }

    /// Weak compare-and-set retried under `policy`
    ///
    /// Retries spurious failures with backoff while the current value still
    /// matches the expected value. Returns `false` once the value differs or
    /// the attempts are exhausted.
    pub fn weak_compare_and_set_retrying(
        &self,
        access: Access,
        args: &[Value],
        policy: &RetryPolicy,
    ) -> Result<bool> {
        if access.mode() != AccessMode::WeakCompareAndSet {
            return Err(VhError::UnsupportedOperation {
                access: access.name().to_string(),
                location: format!("retrying weak compare-and-set on {}", self.location_name()),
            });
        }
        let entry = self.entry(access)?;
        if self.invoke_entry(entry, args)?.as_bool() == Some(true) {
            return Ok(true);
        }

        // The first attempt validated every argument.
        let coords = &args[..self.inner.coords.len()];
        let tolerant = self.behavior == InvokeBehavior::Tolerant;
        let expected = check_value(&args[coords.len()], self.inner.var_type, tolerant)?;
        let read = self.entry(Access::GET_VOLATILE)?;

        let outcome = policy.run(|| {
            let current = self.invoke_entry(read, coords)?;
            if !current.same_as(&expected) {
                return Ok(Some(false));
            }
            Ok(self
                .invoke_entry(entry, args)?
                .as_bool()
                .filter(|success| *success))
        })?;
        Ok(outcome.unwrap_or(false))
    }

    // ------------------------------------------------------------------
    // Dispatch cache support
    // ------------------------------------------------------------------

    pub(crate) fn shape(&self) -> LocationShape {
        let (declaring, slot) = match &self.inner.location {
            Location::Static { class, slot, .. } | Location::Instance { class, slot, .. } => {
                (Some(class.id()), *slot)
            },
            Location::Array => (None, 0),
        };
        LocationShape {
            kind: self.storage_kind(),
            declaring,
            slot,
            var_type: self.inner.var_type,
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<HandleInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn is_same_state(&self, other: &Weak<HandleInner>) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.inner), other.as_ptr())
    }
}

/// Check a value argument against the variable type
///
/// With `tolerant` set, primitive widening conversions are applied.
pub(crate) fn check_value(value: &Value, ty: ElementType, tolerant: bool) -> Result<Value> {
    if ty.is_primitive() {
        if value.primitive_type() == Some(ty) {
            return Ok(value.clone());
        }
        if tolerant {
            if let Some(widened) = value.widen_to(ty) {
                return Ok(widened);
            }
        }
        return Err(VhError::wrong_type(ty, value.type_name()));
    }

    match value {
        Value::Null => Ok(Value::Null),
        Value::Ref(obj) if obj.is_assignable_to(ty) => Ok(value.clone()),
        Value::Ref(_) => Err(VhError::class_cast(ty, value.type_name())),
        _ => Err(VhError::wrong_type(ty, value.type_name())),
    }
}

fn describe_args(args: &[Value]) -> String {
    let types: Vec<String> = args.iter().map(Value::type_name).collect();
    format!("({})", types.join(","))
}

macro_rules! access_methods {
    ($($method:ident => $konst:ident),* $(,)?) => {
        impl VarHandle {
            $(
                #[doc = concat!("Invoke `", stringify!($konst), "` with coordinates then values.")]
                #[inline]
                pub fn $method(&self, args: &[Value]) -> Result<Value> {
                    self.access(Access::$konst, args)
                }
            )*
        }
    };
}

access_methods! {
    get => GET,
    set => SET,
    get_volatile => GET_VOLATILE,
    set_volatile => SET_VOLATILE,
    get_acquire => GET_ACQUIRE,
    set_release => SET_RELEASE,
    get_opaque => GET_OPAQUE,
    set_opaque => SET_OPAQUE,
    compare_and_set => COMPARE_AND_SET,
    compare_and_exchange => COMPARE_AND_EXCHANGE,
    compare_and_exchange_acquire => COMPARE_AND_EXCHANGE_ACQUIRE,
    compare_and_exchange_release => COMPARE_AND_EXCHANGE_RELEASE,
    weak_compare_and_set_plain => WEAK_COMPARE_AND_SET_PLAIN,
    weak_compare_and_set => WEAK_COMPARE_AND_SET,
    weak_compare_and_set_acquire => WEAK_COMPARE_AND_SET_ACQUIRE,
    weak_compare_and_set_release => WEAK_COMPARE_AND_SET_RELEASE,
    get_and_set => GET_AND_SET,
    get_and_set_acquire => GET_AND_SET_ACQUIRE,
    get_and_set_release => GET_AND_SET_RELEASE,
    get_and_add => GET_AND_ADD,
    get_and_add_acquire => GET_AND_ADD_ACQUIRE,
    get_and_add_release => GET_AND_ADD_RELEASE,
    get_and_bitwise_or => GET_AND_BITWISE_OR,
    get_and_bitwise_or_release => GET_AND_BITWISE_OR_RELEASE,
    get_and_bitwise_or_acquire => GET_AND_BITWISE_OR_ACQUIRE,
    get_and_bitwise_and => GET_AND_BITWISE_AND,
    get_and_bitwise_and_release => GET_AND_BITWISE_AND_RELEASE,
    get_and_bitwise_and_acquire => GET_AND_BITWISE_AND_ACQUIRE,
    get_and_bitwise_xor => GET_AND_BITWISE_XOR,
    get_and_bitwise_xor_release => GET_AND_BITWISE_XOR_RELEASE,
    get_and_bitwise_xor_acquire => GET_AND_BITWISE_XOR_ACQUIRE,
}

impl fmt::Debug for VarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarHandle")
            .field("id", &self.inner.id)
            .field("location", &self.location_name())
            .field("behavior", &self.behavior)
            .finish()
    }
}

/// One supported access in a [`VarHandleDesc`]
#[derive(Debug, Clone, Serialize)]
pub struct AccessDesc {
    pub access: Access,
    pub order: MemoryOrder,
    pub method_type: String,
}

/// Serializable summary of a handle
#[derive(Debug, Clone, Serialize)]
pub struct VarHandleDesc {
    pub id: HandleId,
    pub storage: StorageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaring_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub var_type: String,
    pub coordinates: Vec<String>,
    pub writable: bool,
    pub behavior: InvokeBehavior,
    pub accesses: Vec<AccessDesc>,
}
