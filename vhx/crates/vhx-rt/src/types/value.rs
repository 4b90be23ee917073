//! Dynamically typed values

use super::{ElementType, ValueType};
use crate::object::ObjectRef;

/// A value passed to or returned from a handle
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Result of write-only modes
    Void,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    /// UTF-16 code unit
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// The null reference
    Null,
    Ref(ObjectRef),
}

impl Value {
    /// Build a string reference
    pub fn string(s: &str) -> Self {
        Value::Ref(ObjectRef::string(s))
    }

    /// Static type of the value, `None` for `null` and `void`
    pub fn value_type(&self) -> Option<ValueType> {
        let ty = match self {
            Value::Void | Value::Null => return None,
            Value::Boolean(_) => ElementType::Boolean,
            Value::Byte(_) => ElementType::Byte,
            Value::Short(_) => ElementType::Short,
            Value::Char(_) => ElementType::Char,
            Value::Int(_) => ElementType::Int,
            Value::Long(_) => ElementType::Long,
            Value::Float(_) => ElementType::Float,
            Value::Double(_) => ElementType::Double,
            Value::Ref(obj) => return Some(obj.value_type()),
        };
        Some(ValueType::Element(ty))
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            _ => self
                .value_type()
                .map(|ty| ty.to_string())
                .unwrap_or_default(),
        }
    }

    /// Primitive element type of the value, if it is a primitive
    pub(crate) fn primitive_type(&self) -> Option<ElementType> {
        match self.value_type() {
            Some(ValueType::Element(ty)) if ty.is_primitive() => Some(ty),
            _ => None,
        }
    }

    /// Canonical storage bits of a primitive value
    pub(crate) fn to_bits(&self) -> Option<u64> {
        Some(match *self {
            Value::Boolean(v) => v as u64,
            Value::Byte(v) => v as u8 as u64,
            Value::Short(v) => v as u16 as u64,
            Value::Char(v) => v as u64,
            Value::Int(v) => v as u32 as u64,
            Value::Long(v) => v as u64,
            Value::Float(v) => v.to_bits() as u64,
            Value::Double(v) => v.to_bits(),
            _ => return None,
        })
    }

    /// Decode canonical storage bits for the given primitive type
    pub(crate) fn from_bits(ty: ElementType, bits: u64) -> Value {
        match ty {
            ElementType::Boolean => Value::Boolean(bits & 1 != 0),
            ElementType::Byte => Value::Byte(bits as u8 as i8),
            ElementType::Short => Value::Short(bits as u16 as i16),
            ElementType::Char => Value::Char(bits as u16),
            ElementType::Int => Value::Int(bits as u32 as i32),
            ElementType::Long => Value::Long(bits as i64),
            ElementType::Float => Value::Float(f32::from_bits(bits as u32)),
            ElementType::Double => Value::Double(f64::from_bits(bits)),
            _ => Value::Null,
        }
    }

    /// Apply a primitive widening conversion
    ///
    /// Returns the value unchanged when it already has type `target`, and
    /// `None` when no widening conversion exists.
    pub fn widen_to(&self, target: ElementType) -> Option<Value> {
        let source = self.primitive_type()?;
        if source == target {
            return Some(self.clone());
        }
        if target == ElementType::Char || source == ElementType::Boolean {
            return None;
        }
        let (from, to) = (source.widening_rank()?, target.widening_rank()?);
        if from >= to {
            return None;
        }

        let wide = match *self {
            Value::Byte(v) => Widened::Int(v as i64),
            Value::Short(v) => Widened::Int(v as i64),
            Value::Char(v) => Widened::Int(v as i64),
            Value::Int(v) => Widened::Int(v as i64),
            Value::Long(v) => Widened::Int(v),
            Value::Float(v) => Widened::Float(v as f64),
            _ => return None,
        };

        Some(match (wide, target) {
            (Widened::Int(v), ElementType::Short) => Value::Short(v as i16),
            (Widened::Int(v), ElementType::Int) => Value::Int(v as i32),
            (Widened::Int(v), ElementType::Long) => Value::Long(v),
            (Widened::Int(v), ElementType::Float) => Value::Float(v as f32),
            (Widened::Int(v), ElementType::Double) => Value::Double(v as f64),
            (Widened::Float(v), ElementType::Double) => Value::Double(v),
            _ => return None,
        })
    }

    /// Identity comparison used by compare-based access modes
    ///
    /// Primitives compare by canonical bits, references by identity.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Void, Value::Void) => true,
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => match (self.to_bits(), other.to_bits()) {
                (Some(a), Some(b)) => a == b && self.primitive_type() == other.primitive_type(),
                _ => false,
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Reference payload, `None` for `null` and primitives
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }
}

enum Widened {
    Int(i64),
    Float(f64),
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    u16 => Char,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    ObjectRef => Ref,
}

impl From<Option<ObjectRef>> for Value {
    fn from(v: Option<ObjectRef>) -> Self {
        v.map(Value::Ref).unwrap_or(Value::Null)
    }
}
