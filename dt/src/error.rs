//! Error types for the component runtime
//!
//! [`DashError`] covers contract violations: they are returned synchronously
//! to the caller and never retried. [`ListenerError`] covers failures inside
//! listener bodies: those are isolated per callback and routed to the
//! application's error handler instead.

use thiserror::Error;

use crate::id::ComponentId;

/// Contract violations raised by dashes, containers and emitters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashError {
    #[error("Destroyed component: {id}")]
    DestroyedComponent { id: ComponentId },

    #[error("The instance of component {id} is still not initialized")]
    UninitializedInstance { id: ComponentId },

    #[error("Unexposed event: {event}")]
    UnexposedEvent { event: String },

    #[error("The component {child} is not a child of {parent}")]
    NotAChild { parent: ComponentId, child: ComponentId },

    #[error("Cannot find single child {query} in component {parent} (found {found})")]
    Ambiguity {
        parent: ComponentId,
        query: String,
        found: usize,
    },

    #[error("Cannot find the filtered parent of component {id}")]
    FilteredParentNotFound { id: ComponentId },

    #[error("Cannot listen to the destroy event of component {id}")]
    UnlistenableTarget { id: ComponentId },

    #[error("Component {id} is not a {expected}")]
    TypeMismatch { id: ComponentId, expected: &'static str },

    #[error("Object is not a component")]
    NotAComponent,

    #[error("The application already has a root component ({id})")]
    RootExists { id: ComponentId },
}

impl DashError {
    /// Check if this error reports an operation on a torn-down component
    pub fn is_destroyed(&self) -> bool {
        matches!(self, DashError::DestroyedComponent { .. })
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, DashError>;

/// A failure raised by a listener body during delivery
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Listener for '{event}' on component {component} failed: {report}")]
    Failed {
        component: ComponentId,
        event: String,
        report: eyre::Report,
    },

    #[error("Listener for '{event}' on component {component} panicked: {message}")]
    Panicked {
        component: ComponentId,
        event: String,
        message: String,
    },
}

impl ListenerError {
    /// The component whose emitter was delivering
    pub fn component(&self) -> ComponentId {
        match self {
            ListenerError::Failed { component, .. } | ListenerError::Panicked { component, .. } => *component,
        }
    }

    /// The event being delivered when the listener failed
    pub fn event(&self) -> &str {
        match self {
            ListenerError::Failed { event, .. } | ListenerError::Panicked { event, .. } => event,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, ListenerError::Panicked { .. })
    }
}
