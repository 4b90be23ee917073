//! Statically typed facade over [`VarHandle`]

use super::VarHandle;
use crate::access::{Access, AccessMode, MemoryOrder};
use crate::error::{Result, VhError};
use crate::object::ObjectRef;
use crate::types::{ElementType, Value};
use std::fmt;
use std::marker::PhantomData;

/// Rust types that can stand for a handle's variable type
pub trait HandleValue: Clone {
    /// True when `ty` is represented by `Self`
    fn matches(ty: ElementType) -> bool;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! primitive_handle_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl HandleValue for $ty {
                fn matches(ty: ElementType) -> bool {
                    ty == ElementType::$variant
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

primitive_handle_value! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    u16 => Char,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl HandleValue for Option<ObjectRef> {
    fn matches(ty: ElementType) -> bool {
        ty.is_reference()
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            Value::Ref(obj) => Some(Some(obj)),
            _ => None,
        }
    }
}

/// A [`VarHandle`] whose variable type is known to be `T`
///
/// Operations take the coordinates and an explicit [`MemoryOrder`].
pub struct TypedHandle<T> {
    handle: VarHandle,
    _marker: PhantomData<fn() -> T>,
}

impl VarHandle {
    /// View this handle through the Rust type `T`
    ///
    /// Fails with `WrongType` when `T` does not represent the variable type.
    pub fn typed<T: HandleValue>(&self) -> Result<TypedHandle<T>> {
        if !T::matches(self.var_type()) {
            return Err(VhError::wrong_type(
                self.var_type(),
                std::any::type_name::<T>(),
            ));
        }
        Ok(TypedHandle {
            handle: self.with_invoke_exact_behavior(),
            _marker: PhantomData,
        })
    }
}

impl<T: HandleValue> TypedHandle<T> {
    pub fn handle(&self) -> &VarHandle {
        &self.handle
    }

    fn call(
        &self,
        mode: AccessMode,
        order: MemoryOrder,
        coords: &[Value],
        values: &[T],
    ) -> Result<Value> {
        let access = Access::of(mode, order).ok_or_else(|| VhError::UnsupportedOperation {
            access: format!("{:?} with {} ordering", mode, order),
            location: self.handle.location_name(),
        })?;
        let mut args = Vec::with_capacity(coords.len() + values.len());
        args.extend_from_slice(coords);
        args.extend(values.iter().cloned().map(HandleValue::into_value));
        self.handle.access(access, &args)
    }

    fn returned(&self, value: Value) -> Result<T> {
        let actual = value.type_name();
        T::from_value(value).ok_or_else(|| VhError::wrong_type(self.handle.var_type(), actual))
    }

    pub fn get(&self, coords: &[Value], order: MemoryOrder) -> Result<T> {
        let value = self.call(AccessMode::Get, order, coords, &[])?;
        self.returned(value)
    }

    pub fn set(&self, coords: &[Value], value: T, order: MemoryOrder) -> Result<()> {
        self.call(AccessMode::Set, order, coords, &[value]).map(drop)
    }

    pub fn get_and_set(&self, coords: &[Value], value: T, order: MemoryOrder) -> Result<T> {
        let value = self.call(AccessMode::GetAndSet, order, coords, &[value])?;
        self.returned(value)
    }

    pub fn compare_and_set(
        &self,
        coords: &[Value],
        expected: T,
        new: T,
        order: MemoryOrder,
    ) -> Result<bool> {
        let ok = self.call(AccessMode::CompareAndSet, order, coords, &[expected, new])?;
        Ok(ok.as_bool() == Some(true))
    }

    /// May fail spuriously
    pub fn weak_compare_and_set(
        &self,
        coords: &[Value],
        expected: T,
        new: T,
        order: MemoryOrder,
    ) -> Result<bool> {
        let ok = self.call(AccessMode::WeakCompareAndSet, order, coords, &[expected, new])?;
        Ok(ok.as_bool() == Some(true))
    }

    /// Returns the witness value
    pub fn compare_and_exchange(
        &self,
        coords: &[Value],
        expected: T,
        new: T,
        order: MemoryOrder,
    ) -> Result<T> {
        let witness = self.call(AccessMode::CompareAndExchange, order, coords, &[expected, new])?;
        self.returned(witness)
    }

    pub fn get_and_add(&self, coords: &[Value], delta: T, order: MemoryOrder) -> Result<T> {
        let value = self.call(AccessMode::GetAndAdd, order, coords, &[delta])?;
        self.returned(value)
    }

    pub fn get_and_bitwise_and(&self, coords: &[Value], mask: T, order: MemoryOrder) -> Result<T> {
        let value = self.call(AccessMode::GetAndBitwiseAnd, order, coords, &[mask])?;
        self.returned(value)
    }

    pub fn get_and_bitwise_or(&self, coords: &[Value], mask: T, order: MemoryOrder) -> Result<T> {
        let value = self.call(AccessMode::GetAndBitwiseOr, order, coords, &[mask])?;
        self.returned(value)
    }

    pub fn get_and_bitwise_xor(&self, coords: &[Value], mask: T, order: MemoryOrder) -> Result<T> {
        let value = self.call(AccessMode::GetAndBitwiseXor, order, coords, &[mask])?;
        self.returned(value)
    }
}

impl<T> Clone for TypedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedHandle<{}>({:?})", std::any::type_name::<T>(), self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ArrayObject;

    #[test]
    fn test_typed_mismatch() {
        let vh = VarHandle::for_array(ElementType::Int);
        assert!(matches!(vh.typed::<i64>(), Err(VhError::WrongType { .. })));
        assert!(vh.typed::<Option<ObjectRef>>().is_err());
        assert!(vh.typed::<i32>().is_ok());
    }

    #[test]
    fn test_typed_array_ops() {
        let ints = vh_ints();
        let arr = Value::Ref(ArrayObject::new(ElementType::Int, 2).into());
        let at = |i: i32| [arr.clone(), Value::Int(i)];

        ints.set(&at(1), 5, MemoryOrder::Release).unwrap();
        assert_eq!(ints.get(&at(1), MemoryOrder::Acquire).unwrap(), 5);
        assert_eq!(ints.get_and_add(&at(1), 3, MemoryOrder::Volatile).unwrap(), 5);
        assert!(ints.compare_and_set(&at(1), 8, 1, MemoryOrder::Volatile).unwrap());
        assert_eq!(ints.compare_and_exchange(&at(1), 7, 9, MemoryOrder::Acquire).unwrap(), 1);
        assert_eq!(ints.get_and_bitwise_or(&at(1), 6, MemoryOrder::Volatile).unwrap(), 1);
        assert_eq!(ints.get(&at(1), MemoryOrder::Opaque).unwrap(), 7);
        assert_eq!(ints.get(&at(0), MemoryOrder::Plain).unwrap(), 0);
    }

    #[test]
    fn test_typed_illegal_order() {
        let ints = vh_ints();
        let arr = Value::Ref(ArrayObject::new(ElementType::Int, 1).into());
        // No opaque compare-and-set exists.
        let err = ints
            .compare_and_set(&[arr, Value::Int(0)], 0, 1, MemoryOrder::Opaque)
            .unwrap_err();
        assert!(matches!(err, VhError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_typed_references() {
        let vh = VarHandle::for_array(ElementType::String);
        let refs = vh.typed::<Option<ObjectRef>>().unwrap();
        let arr = Value::Ref(ArrayObject::new(ElementType::String, 1).into());
        let coords = [arr, Value::Int(0)];
        let s = ObjectRef::string("x");

        assert_eq!(refs.get_and_set(&coords, Some(s.clone()), MemoryOrder::Volatile).unwrap(), None);
        assert!(refs.get(&coords, MemoryOrder::Acquire).unwrap().is_some_and(|r| r.ptr_eq(&s)));
    }

    fn vh_ints() -> TypedHandle<i32> {
        VarHandle::for_array(ElementType::Int).typed::<i32>().unwrap()
    }
}
