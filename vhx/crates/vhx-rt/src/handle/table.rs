//! Per-handle dispatch tables
//!
//! A handle's table has one entry per supported access, built once at
//! construction. Each entry carries the exact method type and the storage
//! operation. Operations run only after every argument has been checked,
//! so they cannot fail.

use crate::access::{access_type, Access, AccessMode, AccessSet, MemoryOrder, MethodType};
use crate::memory::{BitOp, Slot};
use crate::types::{ElementType, Value, ValueType};

/// Storage operation: slot, element type, ordering, checked value arguments
pub(crate) type AccessOp = fn(&Slot, ElementType, MemoryOrder, &[Value]) -> Value;

#[derive(Clone)]
pub(crate) struct AccessEntry {
    pub access: Access,
    pub method_type: MethodType,
    pub op: AccessOp,
}

impl AccessEntry {
    #[inline]
    pub fn run(&self, slot: &Slot, ty: ElementType, values: &[Value]) -> Value {
        (self.op)(slot, ty, self.access.order(), values)
    }
}

pub(crate) struct AccessTable {
    entries: [Option<AccessEntry>; Access::COUNT],
}

impl AccessTable {
    pub fn build(supported: AccessSet, coords: &[ValueType], var_type: ElementType) -> Self {
        let entries = std::array::from_fn(|ordinal| {
            let access = Access::ALL[ordinal];
            supported.contains(access).then(|| AccessEntry {
                access,
                method_type: access_type(access, coords, var_type),
                op: op_for(access.mode()),
            })
        });
        Self { entries }
    }

    #[inline]
    pub fn get(&self, access: Access) -> Option<&AccessEntry> {
        self.entries[access.ordinal()].as_ref()
    }
}

fn op_for(mode: AccessMode) -> AccessOp {
    match mode {
        AccessMode::Get => op_get,
        AccessMode::Set => op_set,
        AccessMode::GetAndSet => op_get_and_set,
        AccessMode::CompareAndSet => op_compare_and_set,
        AccessMode::WeakCompareAndSet => op_weak_compare_and_set,
        AccessMode::CompareAndExchange => op_compare_and_exchange,
        AccessMode::GetAndAdd => op_get_and_add,
        AccessMode::GetAndBitwiseAnd => op_and,
        AccessMode::GetAndBitwiseOr => op_or,
        AccessMode::GetAndBitwiseXor => op_xor,
    }
}

fn op_get(slot: &Slot, ty: ElementType, order: MemoryOrder, _: &[Value]) -> Value {
    slot.load(ty, order)
}

fn op_set(slot: &Slot, _: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    slot.store(&values[0], order);
    Value::Void
}

fn op_get_and_set(slot: &Slot, ty: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    slot.swap(ty, &values[0], order)
}

fn op_compare_and_set(slot: &Slot, ty: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    let (_, ok) = slot.compare_exchange(ty, &values[0], &values[1], order, false);
    Value::Boolean(ok)
}

fn op_weak_compare_and_set(
    slot: &Slot,
    ty: ElementType,
    order: MemoryOrder,
    values: &[Value],
) -> Value {
    let (_, ok) = slot.compare_exchange(ty, &values[0], &values[1], order, true);
    Value::Boolean(ok)
}

fn op_compare_and_exchange(
    slot: &Slot,
    ty: ElementType,
    order: MemoryOrder,
    values: &[Value],
) -> Value {
    slot.compare_exchange(ty, &values[0], &values[1], order, false).0
}

fn op_get_and_add(slot: &Slot, ty: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    slot.fetch_add(ty, &values[0], order)
}

fn op_and(slot: &Slot, ty: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    slot.fetch_bitwise(ty, BitOp::And, &values[0], order)
}

fn op_or(slot: &Slot, ty: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    slot.fetch_bitwise(ty, BitOp::Or, &values[0], order)
}

fn op_xor(slot: &Slot, ty: ElementType, order: MemoryOrder, values: &[Value]) -> Value {
    slot.fetch_bitwise(ty, BitOp::Xor, &values[0], order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{supported_accesses, StorageKind};

    #[test]
    fn test_table_matches_supported_set() {
        let supported = supported_accesses(StorageKind::Static, ElementType::Float, true);
        let table = AccessTable::build(supported, &[], ElementType::Float);
        for access in Access::ALL {
            assert_eq!(table.get(access).is_some(), supported.contains(access));
        }
    }

    #[test]
    fn test_entry_runs_with_its_order() {
        let supported = supported_accesses(StorageKind::Static, ElementType::Int, true);
        let table = AccessTable::build(supported, &[], ElementType::Int);
        let slot = Slot::new(ElementType::Int);

        let add = table.get(Access::GET_AND_ADD_RELEASE).unwrap();
        assert_eq!(add.run(&slot, ElementType::Int, &[Value::Int(5)]), Value::Int(0));

        let cae = table.get(Access::COMPARE_AND_EXCHANGE_ACQUIRE).unwrap();
        let witness = cae.run(&slot, ElementType::Int, &[Value::Int(5), Value::Int(9)]);
        assert_eq!(witness, Value::Int(5));
        assert_eq!(slot.load(ElementType::Int, MemoryOrder::Volatile), Value::Int(9));
    }
}
