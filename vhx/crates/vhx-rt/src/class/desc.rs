//! Class descriptions
//!
//! A [`ClassDesc`] is what a loader turns into a [`Class`](super::Class).
//! It serializes to JSON, which is the byte format accepted by
//! [`ClassLoader::define_class_bytes`](super::ClassLoader::define_class_bytes).
//! The initializer closure is not part of the serialized form.

use super::init::InitContext;
use crate::error::{Result, VhError};
use crate::object::ObjectRef;
use crate::types::{ElementType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type InitFn = dyn Fn(&InitContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// Class initializer body
///
/// Runs at most once, on the first thread to trigger initialization. An
/// error or panic leaves the class permanently failed.
#[derive(Clone)]
pub struct Initializer(Arc<InitFn>);

impl Initializer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&InitContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Initializer(Arc::new(f))
    }

    pub(crate) fn run(&self, ctx: &InitContext<'_>) -> anyhow::Result<()> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Initializer(..)")
    }
}

/// Compile-time constant value of a field or static assignment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConstValue {
    /// Convert to a value of type `ty`
    ///
    /// Integers must fit the target type; floats only initialize floating
    /// types; strings only initialize `String` and `Object`.
    pub fn to_value(&self, ty: ElementType) -> Result<Value> {
        let out_of_range = || VhError::ClassFormat(format!("constant {:?} does not fit {}", self, ty));
        Ok(match (self, ty) {
            (ConstValue::Bool(v), ElementType::Boolean) => Value::Boolean(*v),
            (ConstValue::Int(v), ElementType::Byte) => {
                Value::Byte(i8::try_from(*v).map_err(|_| out_of_range())?)
            },
            (ConstValue::Int(v), ElementType::Short) => {
                Value::Short(i16::try_from(*v).map_err(|_| out_of_range())?)
            },
            (ConstValue::Int(v), ElementType::Char) => {
                Value::Char(u16::try_from(*v).map_err(|_| out_of_range())?)
            },
            (ConstValue::Int(v), ElementType::Int) => {
                Value::Int(i32::try_from(*v).map_err(|_| out_of_range())?)
            },
            (ConstValue::Int(v), ElementType::Long) => Value::Long(*v),
            (ConstValue::Int(v), ElementType::Float) => Value::Float(*v as f32),
            (ConstValue::Int(v), ElementType::Double) => Value::Double(*v as f64),
            (ConstValue::Float(v), ElementType::Float) => Value::Float(*v as f32),
            (ConstValue::Float(v), ElementType::Double) => Value::Double(*v),
            (ConstValue::Str(s), ElementType::String | ElementType::Object) => {
                Value::Ref(ObjectRef::string(s))
            },
            _ => return Err(out_of_range()),
        })
    }
}

/// Description of one field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDesc {
    pub name: String,

    /// Type name: a primitive, `Object`, `String` or a class name
    #[serde(rename = "type")]
    pub ty: String,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    #[serde(default, rename = "final")]
    pub is_final: bool,

    #[serde(default, rename = "private")]
    pub is_private: bool,

    /// Value the slot holds before the class is initialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstValue>,
}

impl FieldDesc {
    /// Instance field
    pub fn instance(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
            is_static: false,
            is_final: false,
            is_private: false,
            constant: None,
        }
    }

    /// Static field
    pub fn new_static(name: &str, ty: &str) -> Self {
        Self {
            is_static: true,
            ..Self::instance(name, ty)
        }
    }

    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn with_constant(mut self, value: ConstValue) -> Self {
        self.constant = Some(value);
        self
    }
}

/// Static assignment performed by the initializer, before the closure runs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticAssign {
    pub field: String,
    pub value: ConstValue,
}

/// Description of a class to define
///
/// ```
/// use vhx_rt::class::{ClassDesc, ConstValue, FieldDesc};
///
/// let desc = ClassDesc::new("Counter")
///     .field(FieldDesc::new_static("count", "int"))
///     .assign("count", ConstValue::Int(3));
/// assert_eq!(desc.fields.len(), 1);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassDesc {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDesc>,

    #[serde(default)]
    pub static_init: Vec<StaticAssign>,

    #[serde(skip)]
    pub initializer: Option<Initializer>,
}

impl ClassDesc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    pub fn field(mut self, field: FieldDesc) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a static assignment run at initialization
    pub fn assign(mut self, field: &str, value: ConstValue) -> Self {
        self.static_init.push(StaticAssign {
            field: field.to_string(),
            value,
        });
        self
    }

    /// Set the initializer body
    pub fn initializer<F>(mut self, f: F) -> Self
    where
        F: Fn(&InitContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.initializer = Some(Initializer::new(f));
        self
    }

    /// Serialized form accepted by `define_class_bytes`
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode the serialized form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
