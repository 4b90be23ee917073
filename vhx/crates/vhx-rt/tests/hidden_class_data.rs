//! Hidden Class Tests - non-discoverable classes and their class data

mod common;

use common::HandleFixture;
use std::sync::{Arc, Mutex};
use vhx_rt::class::{ClassDesc, FieldDesc};
use vhx_rt::{ElementType, Value, VhError};
use vhx_util::Symbol;

/// Class data is handed to the class's own initializer exactly once
///
/// **Bug this finds:** class data duplicated or lost across takes
#[test]
fn test_class_data_taken_once() {
    let fixture = HandleFixture::new("hidden_once");
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&outcomes);

    let desc = ClassDesc::new("Table")
        .field(FieldDesc::new_static("sum", "long"))
        .initializer(move |ctx| {
            let data: Vec<i64> = ctx.take_class_data()?;
            ctx.set_static("sum", data.iter().sum::<i64>())?;
            seen.lock().unwrap().push(ctx.take_class_data::<Vec<i64>>().map(|_| ()));
            Ok(())
        });
    let class = fixture
        .host
        .lookup()
        .define_hidden_class(desc, vec![1i64, 2, 3, 4], true)
        .unwrap();

    assert!(class.is_initialized());
    let sum = class
        .lookup()
        .find_static_var_handle(&class, "sum", ElementType::Long)
        .unwrap();
    assert_eq!(sum.get(&[]).unwrap(), Value::Long(10));

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], Err(VhError::IllegalAccess(_))));
}

/// Asking for the wrong type leaves the data in place
#[test]
fn test_wrong_type_keeps_data() {
    let fixture = HandleFixture::new("hidden_wrong_type");
    let desc = ClassDesc::new("Typed")
        .field(FieldDesc::new_static("label", "String"))
        .initializer(|ctx| {
            let wrong = ctx.take_class_data::<u64>();
            anyhow::ensure!(
                matches!(wrong, Err(VhError::ClassCast { .. })),
                "expected a cast failure"
            );
            let label: String = ctx.take_class_data()?;
            ctx.set_static("label", Value::string(&label))?;
            Ok(())
        });
    let class = fixture
        .host
        .lookup()
        .define_hidden_class(desc, "hello".to_string(), false)
        .unwrap();

    assert!(!class.is_initialized());
    let label = class
        .lookup()
        .find_static_var_handle(&class, "label", ElementType::String)
        .unwrap();
    let value = label.get(&[]).unwrap();
    assert_eq!(value.as_object().and_then(|o| o.as_str()), Some("hello"));
}

/// Hidden classes cannot be found by name and get unique names
#[test]
fn test_hidden_not_discoverable() {
    let fixture = HandleFixture::new("hidden_names");
    let lookup = fixture.host.lookup();

    let a = lookup
        .define_hidden_class(ClassDesc::new("Proxy"), (), false)
        .unwrap();
    let b = lookup
        .define_hidden_class(ClassDesc::new("Proxy"), (), false)
        .unwrap();

    assert!(a.is_hidden() && b.is_hidden());
    assert_ne!(a.name(), b.name());
    assert_ne!(a.id(), b.id());
    assert!(matches!(lookup.find_class("Proxy"), Err(VhError::ClassNotFound(_))));
    assert!(fixture.loader.find_loaded_class(a.name()).is_none());

    // A visible class of the same name is still definable.
    let visible = lookup.define_class(ClassDesc::new("Proxy")).unwrap();
    assert!(!visible.is_hidden());
    assert!(Arc::ptr_eq(&lookup.find_class("Proxy").unwrap(), &visible));
}

/// Defining hidden classes in a loop leaves the symbol table alone
///
/// **Bug this finds:** every hidden class interning its unique name, so
/// long-running programs grow the global interner without bound
#[test]
fn test_hidden_names_not_interned() {
    // Arrange
    let fixture = HandleFixture::new("hidden_churn");
    let lookup = fixture.host.lookup();

    // Act
    let classes: Vec<_> = (0..64)
        .map(|_| {
            lookup
                .define_hidden_class(
                    ClassDesc::new("Churn").field(FieldDesc::new_static("next", "Churn")),
                    (),
                    false,
                )
                .unwrap()
        })
        .collect();

    // Assert
    for class in &classes {
        assert!(class.name().starts_with("Churn/0x"));
        assert!(Symbol::lookup(class.name()).is_none(), "{} was interned", class.name());

        // Self-typed fields display the unique name without interning it.
        let next = lookup
            .find_static_var_handle(class, "next", class.element_type())
            .unwrap();
        assert_eq!(next.var_type().to_string(), class.name());
    }
}

/// Classes defined without class data have none to take
#[test]
fn test_no_class_data() {
    let fixture = HandleFixture::new("hidden_none");
    let class = fixture.define(ClassDesc::new("Plain").initializer(|ctx| {
        match ctx.take_class_data::<i32>() {
            Err(VhError::IllegalAccess(_)) => Ok(()),
            other => anyhow::bail!("unexpected class data: {:?}", other),
        }
    }));
    class.ensure_initialized().unwrap();
}

/// Serialized descriptions define the same classes as built ones
#[test]
fn test_define_from_bytes() {
    let fixture = HandleFixture::new("hidden_bytes");
    let bytes = ClassDesc::new("FromBytes")
        .field(FieldDesc::new_static("K", "int").with_constant(vhx_rt::class::ConstValue::Int(3)))
        .to_bytes()
        .unwrap();
    let class = fixture.loader.define_class_bytes(&bytes).unwrap();
    let k = fixture.static_handle(&class, "K", ElementType::Int);
    assert_eq!(k.get(&[]).unwrap(), Value::Int(3));

    let err = fixture.loader.define_class_bytes(b"{\"name\": 5}").unwrap_err();
    assert!(matches!(err, VhError::ClassFormat(_)));
}
