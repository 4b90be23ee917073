//! Type Module - element types and dynamically typed values
//!
//! An [`ElementType`] is the type of a storage location: one of the eight
//! primitives, the root `Object` type, `String`, or a user class. A
//! [`Value`] is a dynamically typed argument or result flowing through a
//! handle.
//!
//! Storage encodes primitive values as canonical bit patterns: the value's
//! bits zero-extended to 64. Floating-point values are stored by their raw
//! IEEE bits, so compare-based modes compare bit patterns.

mod value;

pub use value::Value;

use std::fmt;
use vhx_util::symbol::{
    Symbol, SYM_BOOLEAN, SYM_BYTE, SYM_CHAR, SYM_DOUBLE, SYM_FLOAT, SYM_INT, SYM_LONG,
    SYM_OBJECT, SYM_SHORT, SYM_STRING, SYM_VOID,
};

/// Identity of a defined class
///
/// Copyable and free of strong references, so it can be stored in caches
/// and types without keeping the class or its loader alive.
///
/// Hidden classes share the interned name they were declared with; their
/// unique `Name/0x<id>` form exists only when displayed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId {
    id: u64,
    name: Symbol,
    hidden: bool,
}

impl ClassId {
    pub(crate) fn new(id: u64, name: Symbol, hidden: bool) -> Self {
        Self { id, name, hidden }
    }

    /// Process-unique class number
    pub fn as_u64(&self) -> u64 {
        self.id
    }

    /// Declared class name, without the hidden-class suffix
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({}#{})", self.name, self.id)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hidden {
            write!(f, "{}/0x{:x}", self.name, self.id)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Type of a storage location
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    /// Root reference type; accepts any reference
    Object,
    /// Immutable string references
    String,
    /// Instances of a class or its subclasses
    Class(ClassId),
}

/// Coarse classification deciding which access modes are legal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeCategory {
    Boolean,
    Integral,
    Floating,
    Reference,
}

impl ElementType {
    /// All primitive element types
    pub const PRIMITIVES: [ElementType; 8] = [
        ElementType::Boolean,
        ElementType::Byte,
        ElementType::Short,
        ElementType::Char,
        ElementType::Int,
        ElementType::Long,
        ElementType::Float,
        ElementType::Double,
    ];

    /// Resolve a builtin type name
    ///
    /// Returns `None` for class names, which need a loader to resolve.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => ElementType::Boolean,
            "byte" => ElementType::Byte,
            "short" => ElementType::Short,
            "char" => ElementType::Char,
            "int" => ElementType::Int,
            "long" => ElementType::Long,
            "float" => ElementType::Float,
            "double" => ElementType::Double,
            "Object" => ElementType::Object,
            "String" => ElementType::String,
            _ => return None,
        })
    }

    /// Interned name of the type; hidden classes report their declared name
    pub fn symbol(&self) -> Symbol {
        match self {
            ElementType::Boolean => SYM_BOOLEAN,
            ElementType::Byte => SYM_BYTE,
            ElementType::Short => SYM_SHORT,
            ElementType::Char => SYM_CHAR,
            ElementType::Int => SYM_INT,
            ElementType::Long => SYM_LONG,
            ElementType::Float => SYM_FLOAT,
            ElementType::Double => SYM_DOUBLE,
            ElementType::Object => SYM_OBJECT,
            ElementType::String => SYM_STRING,
            ElementType::Class(id) => id.name(),
        }
    }

    pub fn category(&self) -> TypeCategory {
        match self {
            ElementType::Boolean => TypeCategory::Boolean,
            ElementType::Byte
            | ElementType::Short
            | ElementType::Char
            | ElementType::Int
            | ElementType::Long => TypeCategory::Integral,
            ElementType::Float | ElementType::Double => TypeCategory::Floating,
            ElementType::Object | ElementType::String | ElementType::Class(_) => {
                TypeCategory::Reference
            },
        }
    }

    #[inline]
    pub fn is_primitive(&self) -> bool {
        self.category() != TypeCategory::Reference
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.category() == TypeCategory::Reference
    }

    /// Default value of a freshly allocated slot of this type
    pub fn default_value(&self) -> Value {
        match self {
            ElementType::Boolean => Value::Boolean(false),
            ElementType::Byte => Value::Byte(0),
            ElementType::Short => Value::Short(0),
            ElementType::Char => Value::Char(0),
            ElementType::Int => Value::Int(0),
            ElementType::Long => Value::Long(0),
            ElementType::Float => Value::Float(0.0),
            ElementType::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    /// Rank in the primitive widening order, `None` for non-numeric types
    ///
    /// `short` and `char` share a rank, so neither widens to the other.
    pub(crate) fn widening_rank(&self) -> Option<u8> {
        match self {
            ElementType::Byte => Some(0),
            ElementType::Short | ElementType::Char => Some(1),
            ElementType::Int => Some(2),
            ElementType::Long => Some(3),
            ElementType::Float => Some(4),
            ElementType::Double => Some(5),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Class(id) => write!(f, "{}", id),
            _ => f.write_str(self.symbol().as_str()),
        }
    }
}

/// Type of a method-type parameter or return
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Element(ElementType),
    /// Array whose cells have the given component type
    ArrayOf(ElementType),
}

impl ValueType {
    pub const INT: ValueType = ValueType::Element(ElementType::Int);
    pub const BOOLEAN: ValueType = ValueType::Element(ElementType::Boolean);
}

impl From<ElementType> for ValueType {
    fn from(ty: ElementType) -> Self {
        ValueType::Element(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Void => f.write_str(SYM_VOID.as_str()),
            ValueType::Element(ty) => write!(f, "{}", ty),
            ValueType::ArrayOf(ty) => write!(f, "{}[]", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_round_trip() {
        for ty in ElementType::PRIMITIVES {
            assert_eq!(ElementType::from_name(&ty.to_string()), Some(ty));
        }
        assert_eq!(ElementType::from_name("String"), Some(ElementType::String));
        assert_eq!(ElementType::from_name("Point"), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ElementType::Boolean.category(), TypeCategory::Boolean);
        assert_eq!(ElementType::Char.category(), TypeCategory::Integral);
        assert_eq!(ElementType::Double.category(), TypeCategory::Floating);
        let point = ClassId::new(1, Symbol::intern("Point"), false);
        assert!(ElementType::Class(point).is_reference());
    }

    #[test]
    fn test_hidden_class_display() {
        let hidden = ClassId::new(0x2a, Symbol::intern("Point"), true);
        assert_eq!(ElementType::Class(hidden).to_string(), "Point/0x2a");
        assert_eq!(ElementType::Class(hidden).symbol().as_str(), "Point");
        let point = ClassId::new(0x2b, Symbol::intern("Point"), false);
        assert_eq!(ElementType::Class(point).to_string(), "Point");
    }

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::ArrayOf(ElementType::Int).to_string(), "int[]");
        assert_eq!(ValueType::Void.to_string(), "void");
    }
}
