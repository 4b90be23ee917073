//! Class Initialization Tests - triggers, ordering and failure caching
//!
//! The initialization gate must:
//! - run each initializer exactly once, on first observable use
//! - never run it for handle creation, metadata or rejected accesses
//! - initialize the declaring class only, supertypes first
//! - cache failures and report them identically to every caller
//!
//! ============================================================================
//! COUNTERS ARE EXACT - AN INITIALIZER RUNNING TWICE IS A BUG
//! ============================================================================

mod common;

use common::{HandleFixture, TEST_TIMEOUT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use vhx_rt::class::{ClassDesc, ConstValue, FieldDesc, InitState};
use vhx_rt::object::Instance;
use vhx_rt::{Access, ElementType, Value, VhError};

fn counted(counter: &Arc<AtomicUsize>, name: &str, value: i32) -> ClassDesc {
    let counter = Arc::clone(counter);
    ClassDesc::new(name)
        .field(FieldDesc::new_static("value", "int"))
        .field(FieldDesc::instance("slot", "int"))
        .initializer(move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.set_static("value", value)?;
            Ok(())
        })
}

// ============================================================================
// TRIGGERS
// ============================================================================

/// Creating handles and reading metadata never initializes
///
/// **Bug this finds:** eager initialization on lookup or introspection
#[test]
fn test_non_triggers() {
    // Arrange
    let fixture = HandleFixture::new("init_non_triggers");
    let runs = Arc::new(AtomicUsize::new(0));
    let class = fixture.define(counted(&runs, "Lazy", 42));

    // Act
    let vh = fixture.static_handle(&class, "value", ElementType::Int);
    let _ = vh.var_type();
    let _ = vh.coordinate_types();
    let _ = vh.access_mode_type(Access::GET_AND_ADD);
    let _ = vh.is_access_mode_supported(Access::SET);
    let _ = vh.supported_accesses();
    let _ = vh.describe();
    let invoker = vh.to_method_handle(Access::GET);
    let _ = invoker.method_type();
    let _ = fixture.instance_handle(&class, "slot", ElementType::Int);

    // Rejected accesses do not count as use.
    assert!(matches!(vh.set(&[Value::Long(1)]), Err(VhError::WrongType { .. })));
    assert!(matches!(vh.get(&[Value::Int(1)]), Err(VhError::WrongMethodType { .. })));
    let boolean_like = vh.to_method_handle(Access::COMPARE_AND_SET);
    assert!(boolean_like.invoke(&[Value::Float(1.0), Value::Int(1)]).is_err());

    // Assert
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(class.init_state(), InitState::Uninitialized);
}

/// The first access initializes and sees the initializer's writes
///
/// **Bug this finds:** missing trigger, stale value after initialization
#[test]
fn test_first_access_initializes() {
    let fixture = HandleFixture::new("init_first_access");
    let runs = Arc::new(AtomicUsize::new(0));
    let class = fixture.define(counted(&runs, "Eager", 42));
    let vh = fixture.static_handle(&class, "value", ElementType::Int);

    assert_eq!(vh.get_and_add(&[Value::Int(1)]).unwrap(), Value::Int(42));
    assert_eq!(vh.get(&[]).unwrap(), Value::Int(43));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(class.init_state(), InitState::Initialized);
}

/// Invoking an adapter, creating an instance and explicit requests all trigger
#[test]
fn test_other_triggers() {
    let fixture = HandleFixture::new("init_triggers");
    let runs = Arc::new(AtomicUsize::new(0));

    let by_invoker = fixture.define(counted(&runs, "ByInvoker", 1));
    let vh = fixture.static_handle(&by_invoker, "value", ElementType::Int);
    assert_eq!(vh.to_method_handle(Access::GET_ACQUIRE).invoke(&[]).unwrap(), Value::Int(1));
    assert!(by_invoker.is_initialized());

    let by_instance = fixture.define(counted(&runs, "ByInstance", 2));
    let _obj = Instance::new(&by_instance).unwrap();
    assert!(by_instance.is_initialized());

    let explicit = fixture.define(counted(&runs, "Explicit", 3));
    explicit.ensure_initialized().unwrap();
    explicit.ensure_initialized().unwrap();
    assert!(explicit.is_initialized());

    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Arrays of a class type never initialize that class
#[test]
fn test_array_handles_never_initialize() {
    let fixture = HandleFixture::new("init_arrays");
    let runs = Arc::new(AtomicUsize::new(0));
    let class = fixture.define(counted(&runs, "ArrayElem", 1));

    let vh = fixture.array_handle(class.element_type());
    let arr = common::new_array(class.element_type(), 2);
    assert_eq!(vh.get(&[arr, Value::Int(0)]).unwrap(), Value::Null);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

// ============================================================================
// HIERARCHIES
// ============================================================================

/// A handle resolved through a subtype initializes only the declaring type
///
/// **Bug this finds:** gate keyed on the lookup class instead of the
/// declaring class
#[test]
fn test_parent_child() {
    let fixture = HandleFixture::new("init_parent_child");
    let parent = fixture.define(
        ClassDesc::new("Parent")
            .field(FieldDesc::new_static("x", "int"))
            .assign("x", ConstValue::Int(3)),
    );
    let child = fixture.define(ClassDesc::new("Child").extends("Parent").initializer(|ctx| {
        let x = ctx
            .lookup()
            .find_static_var_handle(ctx.class(), "x", ElementType::Int)?;
        x.set(&[Value::Int(6)])?;
        Ok(())
    }));

    let vh = child
        .lookup()
        .find_static_var_handle(&child, "x", ElementType::Int)
        .unwrap();
    assert_eq!(vh.declaring_class().map(|c| c.id()), Some(parent.id()));

    assert_eq!(vh.get(&[]).unwrap(), Value::Int(3));
    assert!(parent.is_initialized());
    assert!(!child.is_initialized());

    child.ensure_initialized().unwrap();
    assert_eq!(vh.get(&[]).unwrap(), Value::Int(6));
}

/// Supertypes are initialized before their subtypes
#[test]
fn test_supertype_initialized_first() {
    let fixture = HandleFixture::new("init_order");
    let order = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&order);
    let _root = fixture.define(ClassDesc::new("Root").initializer(move |_| {
        log.lock().unwrap().push("Root");
        Ok(())
    }));
    let log = Arc::clone(&order);
    let _mid = fixture.define(ClassDesc::new("Mid").extends("Root").initializer(move |_| {
        log.lock().unwrap().push("Mid");
        Ok(())
    }));
    let log = Arc::clone(&order);
    let leaf = fixture.define(ClassDesc::new("Leaf").extends("Mid").initializer(move |_| {
        log.lock().unwrap().push("Leaf");
        Ok(())
    }));

    leaf.ensure_initialized().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["Root", "Mid", "Leaf"]);
}

/// An initializer may use its own class without deadlocking
///
/// **Bug this finds:** non-reentrant gate
#[test]
fn test_recursive_use_from_initializer() {
    let fixture = HandleFixture::new("init_recursive");
    let class = fixture.define(
        ClassDesc::new("SelfUse")
            .field(FieldDesc::new_static("n", "int"))
            .initializer(|ctx| {
                let n = ctx
                    .lookup()
                    .find_static_var_handle(ctx.class(), "n", ElementType::Int)?;
                n.set(&[Value::Int(5)])?;
                n.get_and_add(&[Value::Int(1)])?;
                let _obj = Instance::new(ctx.class())?;
                Ok(())
            }),
    );

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(&class);
    thread::spawn(move || {
        let _ = tx.send(worker.ensure_initialized());
    });
    rx.recv_timeout(TEST_TIMEOUT)
        .expect("initializer deadlocked on its own class")
        .unwrap();

    let vh = fixture.static_handle(&class, "n", ElementType::Int);
    assert_eq!(vh.get(&[]).unwrap(), Value::Int(6));
}

// ============================================================================
// FAILURES
// ============================================================================

/// A failed initializer is cached and never re-run
///
/// **Bug this finds:** retrying initialization, inconsistent error payloads
#[test]
fn test_failure_is_cached() {
    let fixture = HandleFixture::new("init_failure");
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let class = fixture.define(
        ClassDesc::new("Broken")
            .field(FieldDesc::new_static("v", "int"))
            .initializer(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("config missing")
            }),
    );
    let vh = fixture.static_handle(&class, "v", ElementType::Int);

    let first = vh.get(&[]).unwrap_err();
    let second = vh.set(&[Value::Int(1)]).unwrap_err();
    let third = class.ensure_initialized().unwrap_err();

    assert!(matches!(&first, VhError::InitializationFailure { cause, .. } if cause.contains("config missing")));
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(class.init_state(), InitState::Failed);
    assert!(matches!(Instance::new(&class), Err(VhError::InitializationFailure { .. })));
}

/// Panics are failures too
#[test]
fn test_panicking_initializer() {
    let fixture = HandleFixture::new("init_panic");
    let class = fixture.define(ClassDesc::new("Panics").initializer(|_| panic!("boom")));

    let err = class.ensure_initialized().unwrap_err();
    match err {
        VhError::InitializationFailure { class: name, cause } => {
            assert_eq!(name, "Panics");
            assert!(cause.contains("boom"), "{}", cause);
        },
        other => panic!("unexpected error {:?}", other),
    }
}

/// A failed supertype fails its subtypes
#[test]
fn test_failed_supertype() {
    let fixture = HandleFixture::new("init_failed_super");
    let _base = fixture.define(ClassDesc::new("BadBase").initializer(|_| anyhow::bail!("base broken")));
    let sub = fixture.define(ClassDesc::new("GoodSub").extends("BadBase"));

    let err = sub.ensure_initialized().unwrap_err();
    assert!(matches!(&err, VhError::InitializationFailure { cause, .. } if cause.contains("base broken")));
    assert_eq!(sub.init_state(), InitState::Failed);
}

/// Concurrent waiters all observe the same failure
///
/// **Bug this finds:** waiters re-running the initializer or seeing a
/// different error than the initializing thread
#[test]
fn test_concurrent_waiters_see_same_failure() {
    // Arrange
    let fixture = HandleFixture::new("init_concurrent_failure");
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let class = fixture.define(
        ClassDesc::new("SlowBroken")
            .field(FieldDesc::new_static("v", "long"))
            .initializer(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                anyhow::bail!("slow failure")
            }),
    );
    let vh = fixture.static_handle(&class, "v", ElementType::Long);
    let thread_count = 8;
    let barrier = Arc::new(Barrier::new(thread_count));

    // Act
    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let vh = vh.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                vh.get_volatile(&[]).unwrap_err()
            })
        })
        .collect();
    let errors: Vec<VhError> = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .collect();

    // Assert
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    for err in &errors {
        assert_eq!(err, &errors[0]);
        assert!(matches!(err, VhError::InitializationFailure { .. }));
    }
}

/// Concurrent first uses run the initializer once and all see its result
#[test]
fn test_concurrent_initialization_once() {
    let fixture = HandleFixture::new("init_concurrent");
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let class = fixture.define(
        ClassDesc::new("Contended")
            .field(FieldDesc::new_static("v", "int"))
            .initializer(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                ctx.set_static("v", 1000)?;
                Ok(())
            }),
    );
    let vh = fixture.static_handle(&class, "v", ElementType::Int);
    let thread_count = 8;
    let barrier = Arc::new(Barrier::new(thread_count));

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let vh = vh.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                vh.get_and_add(&[Value::Int(1)]).unwrap()
            })
        })
        .collect();
    let mut seen: Vec<i32> = handles
        .into_iter()
        .map(|h| h.join().unwrap().as_i32().unwrap())
        .collect();
    seen.sort_unstable();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(seen, (1000..1000 + thread_count as i32).collect::<Vec<_>>());
}
