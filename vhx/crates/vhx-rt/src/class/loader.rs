//! Class loaders
//!
//! A loader defines classes from descriptions and finds them by name,
//! delegating to its parent first. Its class table holds weak references,
//! so a loader never keeps its own classes alive.

use super::desc::{ClassDesc, FieldDesc};
use super::init::InitGate;
use super::{Class, ClassData, Field};
use crate::error::{Result, VhError};
use crate::logging::{log_event, VhEvent};
use crate::memory::Slot;
use crate::types::{ClassId, ElementType, Value};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use vhx_util::Symbol;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Defines classes and resolves them by name
pub struct ClassLoader {
    name: String,
    parent: Option<Arc<ClassLoader>>,
    classes: Mutex<IndexMap<Symbol, Weak<Class>>>,
}

impl ClassLoader {
    pub fn new(name: &str, parent: Option<Arc<ClassLoader>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parent,
            classes: Mutex::new(IndexMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ClassLoader>> {
        self.parent.as_ref()
    }

    /// Define a class from a structured description
    pub fn define_class(self: &Arc<Self>, desc: ClassDesc) -> Result<Arc<Class>> {
        self.define(desc, None)
    }

    /// Define a class from its serialized description
    ///
    /// Malformed input is a `ClassFormat` error.
    pub fn define_class_bytes(self: &Arc<Self>, bytes: &[u8]) -> Result<Arc<Class>> {
        self.define_class(ClassDesc::from_bytes(bytes)?)
    }

    /// Find a class by name, asking the parent loader first
    pub fn find_class(&self, name: &str) -> Result<Arc<Class>> {
        if let Some(parent) = &self.parent {
            if let Ok(class) = parent.find_class(name) {
                return Ok(class);
            }
        }
        self.find_loaded_class(name)
            .ok_or_else(|| VhError::ClassNotFound(name.to_string()))
    }

    /// Find a live class defined by this loader, without delegation
    pub fn find_loaded_class(&self, name: &str) -> Option<Arc<Class>> {
        let symbol = Symbol::lookup(name)?;
        self.classes.lock().get(&symbol).and_then(Weak::upgrade)
    }

    /// Number of classes defined by this loader that are still alive
    pub fn live_class_count(&self) -> usize {
        self.classes
            .lock()
            .values()
            .filter(|class| class.strong_count() > 0)
            .count()
    }

    pub(crate) fn define(
        self: &Arc<Self>,
        desc: ClassDesc,
        class_data: Option<ClassData>,
    ) -> Result<Arc<Class>> {
        if desc.name.is_empty() {
            return Err(VhError::ClassFormat("class name is empty".to_string()));
        }

        let hidden = class_data.is_some();
        let id = NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed);
        let name = Symbol::intern(&desc.name);
        let class_id = ClassId::new(id, name, hidden);

        let superclass = desc
            .superclass
            .as_deref()
            .map(|superclass| self.find_class(superclass))
            .transpose()?;

        let mut instance_layout: Vec<ElementType> = superclass
            .as_ref()
            .map(|sup| sup.instance_layout().to_vec())
            .unwrap_or_default();
        let mut statics = Vec::new();
        let mut fields = IndexMap::new();

        for field_desc in &desc.fields {
            let field_name = Symbol::intern(&field_desc.name);
            if fields.contains_key(&field_name) {
                return Err(VhError::ClassFormat(format!(
                    "duplicate field {}.{}",
                    desc.name, field_desc.name
                )));
            }

            let ty = self.resolve_type(&field_desc.ty, &desc.name, class_id)?;
            let slot = if field_desc.is_static {
                statics.push(Slot::with_value(ty, &constant_of(field_desc, ty)?));
                statics.len() - 1
            } else {
                if field_desc.constant.is_some() {
                    return Err(VhError::ClassFormat(format!(
                        "instance field {}.{} cannot have a constant value",
                        desc.name, field_desc.name
                    )));
                }
                instance_layout.push(ty);
                instance_layout.len() - 1
            };

            fields.insert(
                field_name,
                Field {
                    name: field_name,
                    ty,
                    is_static: field_desc.is_static,
                    is_final: field_desc.is_final,
                    is_private: field_desc.is_private,
                    slot,
                },
            );
        }

        let static_init = desc
            .static_init
            .iter()
            .map(|assign| {
                let field = fields
                    .get(&Symbol::intern(&assign.field))
                    .filter(|field| field.is_static)
                    .ok_or_else(|| {
                        VhError::ClassFormat(format!(
                            "static assignment to unknown static field {}.{}",
                            desc.name, assign.field
                        ))
                    })?;
                Ok((field.slot, assign.value.to_value(field.ty)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let class = Arc::new(Class {
            id: class_id,
            name: class_id.to_string(),
            loader: Arc::clone(self),
            superclass,
            fields,
            instance_layout: instance_layout.into_boxed_slice(),
            statics: statics.into_boxed_slice(),
            static_init,
            initializer: desc.initializer,
            class_data: Mutex::new(class_data),
            gate: InitGate::new(),
        });

        if !hidden {
            let mut table = self.classes.lock();
            if table.get(&name).and_then(Weak::upgrade).is_some() {
                return Err(VhError::ClassFormat(format!(
                    "duplicate class definition for {} in loader {}",
                    desc.name, self.name
                )));
            }
            table.insert(name, Arc::downgrade(&class));
        }

        log::debug!("loader {} defined {}", self.name, class.name());
        log_event(VhEvent::ClassDefined {
            class: class.name().to_string(),
            loader: self.name.clone(),
            hidden,
        });

        Ok(class)
    }

    fn resolve_type(&self, ty: &str, defining: &str, defining_id: ClassId) -> Result<ElementType> {
        if let Some(builtin) = ElementType::from_name(ty) {
            return Ok(builtin);
        }
        if ty == defining {
            return Ok(ElementType::Class(defining_id));
        }
        Ok(self.find_class(ty)?.element_type())
    }
}

fn constant_of(field: &FieldDesc, ty: ElementType) -> Result<Value> {
    match &field.constant {
        Some(constant) => constant.to_value(ty),
        None => Ok(ty.default_value()),
    }
}

impl fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLoader")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}
