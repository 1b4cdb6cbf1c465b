//! Event records and emission options

use std::any::Any;
use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::container::Container;
use crate::error::{DashError, Result};
use crate::id::ComponentId;

/// A component object, type-erased
pub type Instance = Rc<dyn Any>;

/// Name of the event every container emits synchronously when it is torn down
pub const DESTROY_EVENT: &str = "destroy";

/// Delivery mode for an emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Deliver on the caller's turn, including the whole bubbling walk
    Sync,
    /// Schedule the whole emission as one unit on the application scheduler
    #[default]
    Deferred,
}

/// One or several names (event names or group names)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names(Vec<String>);

impl Names {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl std::fmt::Display for Names {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl From<&str> for Names {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for Names {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&[&str]> for Names {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Vec<&str>> for Names {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Names {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

struct EventRecord {
    name: String,
    data: Value,
    origin: ComponentId,
    source: Weak<Container>,
    stopped: Cell<bool>,
    from_deep: Cell<bool>,
}

/// An immutable event record, shared by every listener of one emission
///
/// Cloning is cheap and yields the same record: a propagation stop made
/// through any clone is seen by the whole bubbling walk.
#[derive(Clone)]
pub struct ComponentEvent {
    record: Rc<EventRecord>,
}

impl ComponentEvent {
    pub(crate) fn new(name: &str, data: Value, source: &Rc<Container>) -> Self {
        Self {
            record: Rc::new(EventRecord {
                name: name.to_string(),
                data,
                origin: source.id(),
                source: Rc::downgrade(source),
                stopped: Cell::new(false),
                from_deep: Cell::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn data(&self) -> &Value {
        &self.record.data
    }

    /// Deserialize the payload into a concrete type
    pub fn data_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.record.data)
    }

    /// Id of the emitting component
    pub fn origin(&self) -> ComponentId {
        self.record.origin
    }

    /// The emitting component's instance, resolved at read time
    ///
    /// Fails with [`DashError::DestroyedComponent`] once the emitter is gone.
    pub fn source(&self) -> Result<Instance> {
        match self.record.source.upgrade() {
            Some(container) => container.instance(),
            None => Err(DashError::DestroyedComponent {
                id: self.record.origin,
            }),
        }
    }

    /// The emitting component's instance, downcast to `T`
    pub fn source_as<T: Any>(&self) -> Result<Rc<T>> {
        self.source()?.downcast::<T>().map_err(|_| DashError::TypeMismatch {
            id: self.record.origin,
            expected: std::any::type_name::<T>(),
        })
    }

    /// Prevent delivery to ancestors not yet reached
    pub fn stop_propagation(&self) {
        self.record.stopped.set(true);
    }

    pub fn is_propagation_allowed(&self) -> bool {
        !self.record.stopped.get()
    }

    /// Whether the current dispatch level is above the origin's parent
    ///
    /// The flag lives on the shared record and is rewritten at every level of
    /// the bubbling walk, so read it inside the listener. A record kept after
    /// its listener returns reports the value of the last level visited.
    pub fn is_from_deep(&self) -> bool {
        self.record.from_deep.get()
    }

    pub(crate) fn set_from_deep(&self, from_deep: bool) {
        self.record.from_deep.set(from_deep);
    }
}

impl std::fmt::Debug for ComponentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentEvent")
            .field("name", &self.record.name)
            .field("origin", &self.record.origin)
            .field("data", &self.record.data)
            .field("stopped", &self.record.stopped.get())
            .finish()
    }
}
