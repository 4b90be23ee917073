//! Shared fixtures for the vhx-rt integration tests
//!
//! Every fixture owns a fresh class loader, so tests can reuse class names
//! without colliding.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use vhx_rt::class::{Class, ClassDesc, ClassLoader};
use vhx_rt::object::{ArrayObject, ObjectRef};
use vhx_rt::{ElementType, Runtime, Value, VarHandle, VhConfig};

/// Upper bound for any blocking wait in a test
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Every element type a handle can be bound to, references included
pub const ALL_TYPES: [ElementType; 10] = [
    ElementType::Boolean,
    ElementType::Byte,
    ElementType::Short,
    ElementType::Char,
    ElementType::Int,
    ElementType::Long,
    ElementType::Float,
    ElementType::Double,
    ElementType::Object,
    ElementType::String,
];

// ============================================================================
// FIXTURE
// ============================================================================

pub struct HandleFixture {
    pub runtime: Runtime,
    pub loader: Arc<ClassLoader>,
    /// Lookup class for array handles
    pub host: Arc<Class>,
}

impl HandleFixture {
    /// Fixture with the default configuration
    ///
    /// **Bug this finds:** default configuration failing validation
    pub fn new(name: &str) -> Self {
        Self::with_config(name, VhConfig::default())
    }

    pub fn with_config(name: &str, config: VhConfig) -> Self {
        let runtime = vhx_rt::init_with_config(config).expect("valid test configuration");
        let loader = runtime.new_loader(name);
        let host = loader
            .define_class(ClassDesc::new("FixtureHost"))
            .expect("fixture host class");
        Self {
            runtime,
            loader,
            host,
        }
    }

    #[track_caller]
    pub fn define(&self, desc: ClassDesc) -> Arc<Class> {
        self.loader
            .define_class(desc)
            .unwrap_or_else(|e| panic!("class definition failed: {}", e))
    }

    #[track_caller]
    pub fn static_handle(&self, class: &Arc<Class>, name: &str, ty: ElementType) -> VarHandle {
        class
            .lookup()
            .find_static_var_handle(class, name, ty)
            .unwrap_or_else(|e| panic!("static handle {}.{}: {}", class.name(), name, e))
    }

    #[track_caller]
    pub fn instance_handle(&self, class: &Arc<Class>, name: &str, ty: ElementType) -> VarHandle {
        class
            .lookup()
            .find_var_handle(class, name, ty)
            .unwrap_or_else(|e| panic!("instance handle {}.{}: {}", class.name(), name, e))
    }

    pub fn array_handle(&self, component: ElementType) -> VarHandle {
        self.host.lookup().array_element_var_handle(component)
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// Two distinct, non-default values of `ty`
pub fn sample_values(ty: ElementType) -> (Value, Value) {
    match ty {
        ElementType::Boolean => (Value::Boolean(true), Value::Boolean(false)),
        ElementType::Byte => (Value::Byte(3), Value::Byte(-7)),
        ElementType::Short => (Value::Short(300), Value::Short(-1)),
        ElementType::Char => (Value::Char(0x41), Value::Char(0xffff)),
        ElementType::Int => (Value::Int(42), Value::Int(i32::MIN)),
        ElementType::Long => (Value::Long(1 << 40), Value::Long(-9)),
        ElementType::Float => (Value::Float(1.5), Value::Float(-0.25)),
        ElementType::Double => (Value::Double(2.5e300), Value::Double(-3.0)),
        _ => (Value::string("first"), Value::string("second")),
    }
}

/// A fresh array of `len` default cells, as a value
pub fn new_array(component: ElementType, len: usize) -> Value {
    Value::Ref(ObjectRef::from(ArrayObject::new(component, len)))
}

pub fn int_array(values: &[i32]) -> Value {
    let values: Vec<Value> = values.iter().copied().map(Value::Int).collect();
    let array = ArrayObject::from_values(ElementType::Int, &values).expect("int values");
    Value::Ref(ObjectRef::from(array))
}

/// Value arguments that satisfy the access type of `handle` for `access`
pub fn value_args(handle: &VarHandle, access: vhx_rt::Access, values: (&Value, &Value)) -> Vec<Value> {
    let coords = handle.coordinate_types().len();
    let params = handle.access_mode_type(access).param_count() - coords;
    match params {
        0 => vec![],
        1 => vec![values.1.clone()],
        _ => vec![values.0.clone(), values.1.clone()],
    }
}

// ============================================================================
// STRICT ASSERTION HELPERS
// ============================================================================

/// Assert two values are the same value: bitwise for primitives, identity
/// for references
///
/// **Tolerance:** ZERO
#[track_caller]
pub fn assert_same_value(actual: &Value, expected: &Value, context: &str) {
    assert!(
        actual.same_as(expected),
        "{}: expected {:?}, got {:?}",
        context,
        expected,
        actual
    );
}
