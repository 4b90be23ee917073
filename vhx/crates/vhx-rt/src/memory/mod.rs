//! Memory Module - atomic storage slots
//!
//! Every field and array cell is a [`Slot`]. Primitive slots hold the
//! canonical zero-extended bits of their value in an `AtomicU64`; reference
//! slots are epoch-managed [`reference::ReferenceCell`]s.
//!
//! Slots do not type-check their arguments: the handle layer validates
//! every value before it reaches storage.

mod reference;

use crate::access::MemoryOrder;
use crate::object::ObjectRef;
use crate::types::{ElementType, Value};
use reference::ReferenceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bitwise update operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BitOp {
    And,
    Or,
    Xor,
}

/// A single storage location
pub(crate) enum Slot {
    Bits(AtomicU64),
    Ref(ReferenceCell),
}

impl Slot {
    /// Slot holding the default value of `ty`
    pub fn new(ty: ElementType) -> Self {
        Self::with_value(ty, &ty.default_value())
    }

    /// Slot holding `value`, which must already have been checked against `ty`
    pub fn with_value(ty: ElementType, value: &Value) -> Self {
        if ty.is_reference() {
            Slot::Ref(ReferenceCell::new(reference_of(value)))
        } else {
            Slot::Bits(AtomicU64::new(value.to_bits().unwrap_or_default()))
        }
    }

    pub fn load(&self, ty: ElementType, order: MemoryOrder) -> Value {
        match self {
            Slot::Bits(bits) => Value::from_bits(ty, bits.load(order.load())),
            Slot::Ref(cell) => cell.load(order).into(),
        }
    }

    pub fn store(&self, value: &Value, order: MemoryOrder) {
        match self {
            Slot::Bits(bits) => bits.store(value.to_bits().unwrap_or_default(), order.store()),
            Slot::Ref(cell) => cell.store(reference_of(value), order),
        }
    }

    pub fn swap(&self, ty: ElementType, value: &Value, order: MemoryOrder) -> Value {
        match self {
            Slot::Bits(bits) => {
                let old = bits.swap(value.to_bits().unwrap_or_default(), order.rmw());
                Value::from_bits(ty, old)
            },
            Slot::Ref(cell) => cell.swap(reference_of(value), order).into(),
        }
    }

    /// Compare-and-exchange returning the witness value and the outcome
    ///
    /// `weak` selects a primitive that may fail spuriously.
    pub fn compare_exchange(
        &self,
        ty: ElementType,
        expected: &Value,
        new: &Value,
        order: MemoryOrder,
        weak: bool,
    ) -> (Value, bool) {
        match self {
            Slot::Bits(bits) => {
                let expected = expected.to_bits().unwrap_or_default();
                let new = new.to_bits().unwrap_or_default();
                let result = if weak {
                    bits.compare_exchange_weak(expected, new, order.rmw(), order.failure())
                } else {
                    bits.compare_exchange(expected, new, order.rmw(), order.failure())
                };
                match result {
                    Ok(old) => (Value::from_bits(ty, old), true),
                    Err(current) => (Value::from_bits(ty, current), false),
                }
            },
            Slot::Ref(cell) => {
                let expected = reference_of(expected);
                let exchange = cell.compare_exchange(expected.as_ref(), reference_of(new), order, weak);
                (exchange.witness.into(), exchange.success)
            },
        }
    }

    /// Atomic add with wrapping integer and IEEE floating-point semantics
    pub fn fetch_add(&self, ty: ElementType, delta: &Value, order: MemoryOrder) -> Value {
        let Slot::Bits(bits) = self else {
            return Value::Null;
        };

        if ty == ElementType::Long {
            let delta = delta.to_bits().unwrap_or_default();
            return Value::from_bits(ty, bits.fetch_add(delta, order.rmw()));
        }

        let mut current = bits.load(order.failure());
        loop {
            let next = add_bits(ty, current, delta);
            match bits.compare_exchange_weak(current, next, order.rmw(), order.failure()) {
                Ok(old) => return Value::from_bits(ty, old),
                Err(actual) => current = actual,
            }
        }
    }

    /// Atomic bitwise update
    ///
    /// Canonical bits stay canonical under and/or/xor, so the raw word
    /// operations apply directly.
    pub fn fetch_bitwise(&self, ty: ElementType, op: BitOp, operand: &Value, order: MemoryOrder) -> Value {
        let Slot::Bits(bits) = self else {
            return Value::Null;
        };
        let operand = operand.to_bits().unwrap_or_default();
        let old = match op {
            BitOp::And => bits.fetch_and(operand, order.rmw()),
            BitOp::Or => bits.fetch_or(operand, order.rmw()),
            BitOp::Xor => bits.fetch_xor(operand, order.rmw()),
        };
        Value::from_bits(ty, old)
    }
}

fn reference_of(value: &Value) -> Option<ObjectRef> {
    value.as_object().cloned()
}

fn add_bits(ty: ElementType, current: u64, delta: &Value) -> u64 {
    let sum = match (Value::from_bits(ty, current), delta) {
        (Value::Byte(a), Value::Byte(b)) => Value::Byte(a.wrapping_add(*b)),
        (Value::Short(a), Value::Short(b)) => Value::Short(a.wrapping_add(*b)),
        (Value::Char(a), Value::Char(b)) => Value::Char(a.wrapping_add(*b)),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(*b)),
        (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
        (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (current, _) => current,
    };
    sum.to_bits().unwrap_or(current)
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Bits(bits) => write!(f, "Slot::Bits({:#x})", bits.load(Ordering::Relaxed)),
            Slot::Ref(_) => f.write_str("Slot::Ref(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_order() {
        for order in MemoryOrder::ALL {
            let slot = Slot::new(ElementType::Short);
            slot.store(&Value::Short(-7), order);
            assert_eq!(slot.load(ElementType::Short, order), Value::Short(-7));
        }
    }

    #[test]
    fn test_fetch_add_wraps() {
        let slot = Slot::with_value(ElementType::Byte, &Value::Byte(i8::MAX));
        let old = slot.fetch_add(ElementType::Byte, &Value::Byte(1), MemoryOrder::Volatile);
        assert_eq!(old, Value::Byte(i8::MAX));
        assert_eq!(slot.load(ElementType::Byte, MemoryOrder::Plain), Value::Byte(i8::MIN));

        let slot = Slot::with_value(ElementType::Long, &Value::Long(-1));
        slot.fetch_add(ElementType::Long, &Value::Long(3), MemoryOrder::Release);
        assert_eq!(slot.load(ElementType::Long, MemoryOrder::Acquire), Value::Long(2));
    }

    #[test]
    fn test_fetch_add_float() {
        let slot = Slot::with_value(ElementType::Float, &Value::Float(1.5));
        slot.fetch_add(ElementType::Float, &Value::Float(2.25), MemoryOrder::Acquire);
        assert_eq!(slot.load(ElementType::Float, MemoryOrder::Plain), Value::Float(3.75));
    }

    #[test]
    fn test_bitwise_keeps_negative_short_canonical() {
        let slot = Slot::with_value(ElementType::Short, &Value::Short(-1));
        slot.fetch_bitwise(ElementType::Short, BitOp::Xor, &Value::Short(0x00ff), MemoryOrder::Volatile);
        assert_eq!(slot.load(ElementType::Short, MemoryOrder::Plain), Value::Short(-256));
    }

    #[test]
    fn test_compare_exchange_reports_witness() {
        let slot = Slot::with_value(ElementType::Int, &Value::Int(1));
        let (witness, ok) = slot.compare_exchange(
            ElementType::Int,
            &Value::Int(2),
            &Value::Int(3),
            MemoryOrder::Volatile,
            false,
        );
        assert!(!ok);
        assert_eq!(witness, Value::Int(1));
    }
}
