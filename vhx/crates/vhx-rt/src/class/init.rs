//! Class initialization gate
//!
//! Each class moves through
//!
//! ```text
//! Uninitialized ──first use──▶ Initializing ──▶ Initialized
//!                                          └──▶ Failed
//! ```
//!
//! exactly once. The state word is read with acquire ordering on the fast
//! path and published with release ordering, so everything the initializer
//! wrote is visible to any thread that observes `Initialized`.
//!
//! Other threads arriving while a class is `Initializing` block on a
//! condition variable. The initializing thread itself passes straight
//! through, so initializers may use their own class recursively.
//!
//! A failure is recorded once and reported identically to every waiter and
//! every later caller; the initializer never runs again.

use super::{Class, Lookup};
use crate::error::{Result, VhError};
use crate::logging::{log_event, VhEvent};
use crate::types::Value;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Instant;
use vhx_util::Symbol;

/// Initialization state of a class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum InitState {
    Uninitialized = 0,
    Initializing = 1,
    Initialized = 2,
    Failed = 3,
}

impl InitState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => InitState::Uninitialized,
            1 => InitState::Initializing,
            2 => InitState::Initialized,
            _ => InitState::Failed,
        }
    }
}

struct GateInner {
    /// Thread currently running the initializer
    owner: Option<ThreadId>,
    /// Cached failure cause
    failure: Option<Arc<str>>,
}

pub(crate) struct InitGate {
    state: AtomicU8,
    inner: Mutex<GateInner>,
    cond: Condvar,
}

impl InitGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(InitState::Uninitialized as u8),
            inner: Mutex::new(GateInner {
                owner: None,
                failure: None,
            }),
            cond: Condvar::new(),
        }
    }

    #[inline]
    fn state(&self) -> InitState {
        InitState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn publish(&self, state: InitState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// What the calling thread must do after consulting the gate
enum Admission {
    Done,
    Reentrant,
    Run,
}

impl Class {
    /// Current initialization state
    pub fn init_state(&self) -> InitState {
        self.gate.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.gate.state() == InitState::Initialized
    }

    /// Run the class initializer if it has not run yet
    ///
    /// Blocks while another thread is initializing the class. Returns the
    /// cached [`VhError::InitializationFailure`] if initialization failed,
    /// now or earlier.
    pub fn ensure_initialized(self: &Arc<Self>) -> Result<()> {
        if self.gate.state() == InitState::Initialized {
            return Ok(());
        }
        self.initialize_slow()
    }

    fn failure(&self, cause: &Arc<str>) -> VhError {
        VhError::InitializationFailure {
            class: self.name().to_string(),
            cause: Arc::clone(cause),
        }
    }

    fn admit(&self) -> Result<Admission> {
        let me = thread::current().id();
        let mut inner = self.gate.inner.lock();
        loop {
            match self.gate.state() {
                InitState::Initialized => return Ok(Admission::Done),
                InitState::Failed => {
                    let cause = inner.failure.clone().unwrap_or_else(|| Arc::from("unknown"));
                    return Err(self.failure(&cause));
                },
                InitState::Initializing if inner.owner == Some(me) => {
                    return Ok(Admission::Reentrant)
                },
                InitState::Initializing => self.gate.cond.wait(&mut inner),
                InitState::Uninitialized => {
                    inner.owner = Some(me);
                    self.gate.publish(InitState::Initializing);
                    return Ok(Admission::Run);
                },
            }
        }
    }

    fn initialize_slow(self: &Arc<Self>) -> Result<()> {
        match self.admit()? {
            Admission::Done | Admission::Reentrant => return Ok(()),
            Admission::Run => {},
        }

        let class = self.name().to_string();
        log_event(VhEvent::InitStart {
            class: class.clone(),
        });
        let started = Instant::now();

        let outcome = self.run_initializer();

        let mut inner = self.gate.inner.lock();
        inner.owner = None;
        let result = match outcome {
            Ok(()) => {
                self.gate.publish(InitState::Initialized);
                Ok(())
            },
            Err(cause) => {
                inner.failure = Some(Arc::clone(&cause));
                self.gate.publish(InitState::Failed);
                Err(cause)
            },
        };
        self.gate.cond.notify_all();
        drop(inner);

        match result {
            Ok(()) => {
                log_event(VhEvent::InitEnd {
                    class,
                    duration_us: started.elapsed().as_micros() as u64,
                });
                Ok(())
            },
            Err(cause) => {
                log::warn!("initialization of {} failed: {}", class, cause);
                log_event(VhEvent::InitFailed {
                    class,
                    cause: cause.to_string(),
                });
                Err(self.failure(&cause))
            },
        }
    }

    /// Superclass first, then static assignments, then the initializer body
    fn run_initializer(self: &Arc<Self>) -> std::result::Result<(), Arc<str>> {
        if let Some(superclass) = &self.superclass {
            superclass
                .ensure_initialized()
                .map_err(|err| Arc::from(err.to_string()))?;
        }

        for (slot, value) in &self.static_init {
            if let Some(slot) = self.statics.get(*slot) {
                slot.store(value, crate::access::MemoryOrder::Plain);
            }
        }

        let Some(initializer) = &self.initializer else {
            return Ok(());
        };

        let ctx = InitContext { class: self };
        match panic::catch_unwind(AssertUnwindSafe(|| initializer.run(&ctx))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Arc::from(format!("{:#}", err))),
            Err(payload) => Err(Arc::from(format!("panic: {}", panic_message(&*payload)))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

/// Capabilities of a running class initializer
pub struct InitContext<'a> {
    class: &'a Arc<Class>,
}

impl InitContext<'_> {
    /// The class being initialized
    pub fn class(&self) -> &Arc<Class> {
        self.class
    }

    /// Full-privilege lookup on the class being initialized
    pub fn lookup(&self) -> Lookup {
        self.class.lookup()
    }

    fn static_field(&self, name: &str) -> Result<super::Field> {
        let field = Symbol::lookup(name).and_then(|symbol| self.class.declared_field(symbol));
        match field {
            Some(field) if field.is_static() => Ok(field.clone()),
            Some(_) => Err(VhError::IllegalAccess(format!(
                "{}.{} is not static",
                self.class.name(),
                name
            ))),
            None => Err(VhError::NoSuchField {
                class: self.class.name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Write a static field of the class, including `final` ones
    pub fn set_static(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.static_field(name)?;
        let value = crate::handle::check_value(&value.into(), field.ty(), false)?;
        if let Some(slot) = self.class.static_slot(field.slot()) {
            slot.store(&value, crate::access::MemoryOrder::Plain);
        }
        Ok(())
    }

    /// Read a static field of the class
    pub fn get_static(&self, name: &str) -> Result<Value> {
        let field = self.static_field(name)?;
        Ok(self
            .class
            .static_slot(field.slot())
            .map(|slot| slot.load(field.ty(), crate::access::MemoryOrder::Plain))
            .unwrap_or_else(|| field.ty().default_value()))
    }

    /// Take the class data attached when the class was defined
    ///
    /// Succeeds at most once per class. Asking for the wrong type fails with
    /// `ClassCast` and leaves the data in place.
    pub fn take_class_data<T: Any + Send + Sync>(&self) -> Result<T> {
        let mut slot = self.class.class_data.lock();
        let data = slot.take().ok_or_else(|| {
            VhError::IllegalAccess(format!("class data of {} already taken", self.class.name()))
        })?;
        match data.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(data) => {
                *slot = Some(data);
                Err(VhError::class_cast(
                    std::any::type_name::<T>(),
                    "class data",
                ))
            },
        }
    }
}
