//! Access method types
//!
//! Every access has an exact signature derived from its mode shape, the
//! handle's coordinate types and its variable type.

use super::mode::{Access, AccessShape};
use crate::types::{ElementType, ValueType};
use std::fmt;

/// Signature of an access: parameter types and return type
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodType {
    params: Vec<ValueType>,
    ret: ValueType,
}

impl MethodType {
    pub fn new(ret: impl Into<ValueType>, params: impl IntoIterator<Item = ValueType>) -> Self {
        Self {
            params: params.into_iter().collect(),
            ret: ret.into(),
        }
    }

    /// Signature with a `void` return
    pub fn void(params: impl IntoIterator<Item = ValueType>) -> Self {
        Self::new(ValueType::Void, params)
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn return_type(&self) -> ValueType {
        self.ret
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.ret)
    }
}

/// Exact method type of `access` for the given coordinates and variable type
///
/// ```
/// use vhx_rt::access::{access_type, Access};
/// use vhx_rt::types::{ElementType, ValueType};
///
/// let coords = [ValueType::ArrayOf(ElementType::Int), ValueType::INT];
/// let mt = access_type(Access::COMPARE_AND_SET, &coords, ElementType::Int);
/// assert_eq!(mt.to_string(), "(int[],int,int,int)boolean");
/// ```
pub fn access_type(access: Access, coords: &[ValueType], var_type: ElementType) -> MethodType {
    let value = ValueType::Element(var_type);
    let mut params = coords.to_vec();

    let ret = match access.mode().shape() {
        AccessShape::Read => value,
        AccessShape::Write => {
            params.push(value);
            ValueType::Void
        },
        AccessShape::CompareAndSet => {
            params.extend([value, value]);
            ValueType::BOOLEAN
        },
        AccessShape::CompareAndExchange => {
            params.extend([value, value]);
            value
        },
        AccessShape::GetAndUpdate => {
            params.push(value);
            value
        },
    };

    MethodType { params, ret }
}
