//! Lookups: field resolution, handle creation and class definition
//!
//! A lookup carries the access rights of its lookup class. Private fields
//! are visible only to a lookup on their declaring class.

use super::{Class, ClassDesc, ClassLoader, Field};
use crate::error::{Result, VhError};
use crate::handle::VarHandle;
use crate::types::ElementType;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use vhx_util::Symbol;

#[derive(Clone)]
pub struct Lookup {
    class: Arc<Class>,
}

impl Lookup {
    pub(crate) fn new(class: Arc<Class>) -> Self {
        Self { class }
    }

    /// Class whose access rights this lookup carries
    pub fn lookup_class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Loader of the lookup class
    pub fn loader(&self) -> &Arc<ClassLoader> {
        self.class.loader()
    }

    /// Find a class through the lookup class's loader
    pub fn find_class(&self, name: &str) -> Result<Arc<Class>> {
        self.loader().find_class(name)
    }

    fn resolve(
        &self,
        receiver: &Arc<Class>,
        name: &str,
        ty: ElementType,
        want_static: bool,
    ) -> Result<(Arc<Class>, Field)> {
        let no_such_field = || VhError::NoSuchField {
            class: receiver.name().to_string(),
            name: name.to_string(),
        };

        let symbol = Symbol::lookup(name).ok_or_else(no_such_field)?;
        let (declaring, field) = receiver.resolve_field(symbol).ok_or_else(no_such_field)?;

        if field.ty() != ty {
            return Err(no_such_field());
        }

        if field.is_static() != want_static {
            let (expected, actual) = if want_static {
                ("static", "instance")
            } else {
                ("instance", "static")
            };
            return Err(VhError::IllegalAccess(format!(
                "expected {} field {}.{}, found {} field",
                expected,
                declaring.name(),
                name,
                actual
            )));
        }

        if field.is_private() && declaring.id() != self.class.id() {
            return Err(VhError::IllegalAccess(format!(
                "{}.{} is private and not accessible from {}",
                declaring.name(),
                name,
                self.class.name()
            )));
        }

        Ok((declaring, field))
    }

    /// Handle on an instance field of `receiver` or one of its superclasses
    pub fn find_var_handle(
        &self,
        receiver: &Arc<Class>,
        name: &str,
        ty: ElementType,
    ) -> Result<VarHandle> {
        let (declaring, field) = self.resolve(receiver, name, ty, false)?;
        Ok(VarHandle::for_instance(declaring, &field))
    }

    /// Handle on a static field declared by `class` or one of its superclasses
    ///
    /// The handle is bound to the declaring class: accessing it initializes
    /// that class only.
    pub fn find_static_var_handle(
        &self,
        class: &Arc<Class>,
        name: &str,
        ty: ElementType,
    ) -> Result<VarHandle> {
        let (declaring, field) = self.resolve(class, name, ty, true)?;
        Ok(VarHandle::for_static(declaring, &field))
    }

    /// Handle on the cells of arrays with the given component type
    pub fn array_element_var_handle(&self, component: ElementType) -> VarHandle {
        VarHandle::for_array(component)
    }

    /// Define a class in the lookup class's loader
    pub fn define_class(&self, desc: ClassDesc) -> Result<Arc<Class>> {
        self.loader().define_class(desc)
    }

    /// Define a hidden class carrying `class_data`
    ///
    /// The class cannot be found by name and its data can be taken once,
    /// from its own initializer. With `initialize` set the class is
    /// initialized before returning.
    pub fn define_hidden_class<T: Any + Send + Sync>(
        &self,
        desc: ClassDesc,
        class_data: T,
        initialize: bool,
    ) -> Result<Arc<Class>> {
        let class = self.loader().define(desc, Some(Box::new(class_data)))?;
        if initialize {
            class.ensure_initialized()?;
        }
        Ok(class)
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lookup({})", self.class.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::FieldDesc;

    fn fixture() -> (Arc<Class>, Arc<Class>) {
        let loader = ClassLoader::new("lookup_tests", None);
        let base = loader
            .define_class(
                ClassDesc::new("LookupBase")
                    .field(FieldDesc::instance("secret", "int").with_private())
                    .field(FieldDesc::instance("shared", "long"))
                    .field(FieldDesc::new_static("COUNT", "int")),
            )
            .unwrap();
        let derived = loader
            .define_class(ClassDesc::new("LookupDerived").extends("LookupBase"))
            .unwrap();
        (base, derived)
    }

    #[test]
    fn test_inherited_field_resolves_to_declaring_class() {
        let (base, derived) = fixture();
        let vh = derived
            .lookup()
            .find_var_handle(&derived, "shared", ElementType::Long)
            .unwrap();
        assert_eq!(vh.declaring_class().map(|c| c.id()), Some(base.id()));
    }

    #[test]
    fn test_private_field_foreign_lookup() {
        let (base, derived) = fixture();
        let err = derived
            .lookup()
            .find_var_handle(&base, "secret", ElementType::Int)
            .unwrap_err();
        assert!(matches!(err, VhError::IllegalAccess(_)));
        assert!(base.lookup().find_var_handle(&base, "secret", ElementType::Int).is_ok());
    }

    #[test]
    fn test_static_instance_mismatch() {
        let (base, _) = fixture();
        let lookup = base.lookup();
        let err = lookup.find_var_handle(&base, "COUNT", ElementType::Int).unwrap_err();
        assert!(matches!(err, VhError::IllegalAccess(_)));
        let err = lookup
            .find_static_var_handle(&base, "shared", ElementType::Long)
            .unwrap_err();
        assert!(matches!(err, VhError::IllegalAccess(_)));
    }

    #[test]
    fn test_wrong_type_is_no_such_field() {
        let (base, _) = fixture();
        let err = base
            .lookup()
            .find_var_handle(&base, "shared", ElementType::Int)
            .unwrap_err();
        assert!(matches!(err, VhError::NoSuchField { .. }));
    }

    #[test]
    fn test_hidden_class_not_findable() {
        let (base, _) = fixture();
        let hidden = base
            .lookup()
            .define_hidden_class(ClassDesc::new("LookupHidden"), 42u32, false)
            .unwrap();
        assert!(hidden.is_hidden());
        assert!(hidden.name().starts_with("LookupHidden/0x"));
        assert!(base.lookup().find_class("LookupHidden").is_err());
    }
}
