//! Component identity

use std::any::Any;
use std::rc::Rc;

/// Opaque component identifier, allocated by the application in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a value designates a component: by id or by instance identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKey {
    Id(ComponentId),
    Instance(usize),
}

impl ComponentKey {
    /// Key for an instance, by allocation address
    pub fn of_instance<T: ?Sized>(instance: &Rc<T>) -> Self {
        ComponentKey::Instance(Rc::as_ptr(instance) as *const () as usize)
    }
}

/// Anything that can designate a component: its id, its instance, or one of its dashes
pub trait AsComponent {
    fn component_key(&self) -> ComponentKey;
}

impl AsComponent for ComponentId {
    fn component_key(&self) -> ComponentKey {
        ComponentKey::Id(*self)
    }
}

impl<T: ?Sized + Any> AsComponent for Rc<T> {
    fn component_key(&self) -> ComponentKey {
        ComponentKey::of_instance(self)
    }
}

impl<T: AsComponent + ?Sized> AsComponent for &T {
    fn component_key(&self) -> ComponentKey {
        (**self).component_key()
    }
}
