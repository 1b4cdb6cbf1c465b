//! Callback shapes accepted by transmitters
//!
//! A callback is one of three delivery modes:
//! - **event-only**: receives the event record
//! - **data-first**: receives the payload, then the event record
//! - **arguments**: receives the payload's array elements as a slice
//!
//! Bound callbacks hold their receiver weakly: once the receiver is dropped
//! the callback turns into a no-op instead of keeping the receiver alive.

use std::rc::Rc;

use serde_json::Value;

use crate::event::ComponentEvent;

type EventFn = dyn Fn(&ComponentEvent) -> eyre::Result<()>;
type DataFn = dyn Fn(&Value, &ComponentEvent) -> eyre::Result<()>;
type ArgsFn = dyn Fn(&[Value]) -> eyre::Result<()>;

/// Delivery mode of a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMode {
    EventOnly,
    DataFirst,
    Arguments,
}

/// A listener callback, tagged by delivery mode
#[derive(Clone)]
pub enum Callback {
    EventOnly(Rc<EventFn>),
    DataFirst(Rc<DataFn>),
    Arguments(Rc<ArgsFn>),
}

impl Callback {
    pub fn event_only(f: impl Fn(&ComponentEvent) -> eyre::Result<()> + 'static) -> Self {
        Callback::EventOnly(Rc::new(f))
    }

    pub fn data_first(f: impl Fn(&Value, &ComponentEvent) -> eyre::Result<()> + 'static) -> Self {
        Callback::DataFirst(Rc::new(f))
    }

    pub fn arguments(f: impl Fn(&[Value]) -> eyre::Result<()> + 'static) -> Self {
        Callback::Arguments(Rc::new(f))
    }

    /// Event-only callback invoking a method on a weakly held receiver
    pub fn bound_event<R: 'static>(receiver: &Rc<R>, method: fn(&R, &ComponentEvent) -> eyre::Result<()>) -> Self {
        let receiver = Rc::downgrade(receiver);
        Callback::event_only(move |event| match receiver.upgrade() {
            Some(r) => method(&r, event),
            None => Ok(()),
        })
    }

    /// Data-first callback invoking a method on a weakly held receiver
    pub fn bound_data<R: 'static>(
        receiver: &Rc<R>,
        method: fn(&R, &Value, &ComponentEvent) -> eyre::Result<()>,
    ) -> Self {
        let receiver = Rc::downgrade(receiver);
        Callback::data_first(move |data, event| match receiver.upgrade() {
            Some(r) => method(&r, data, event),
            None => Ok(()),
        })
    }

    /// Arguments callback invoking a method on a weakly held receiver
    pub fn bound_arguments<R: 'static>(receiver: &Rc<R>, method: fn(&R, &[Value]) -> eyre::Result<()>) -> Self {
        let receiver = Rc::downgrade(receiver);
        Callback::arguments(move |args| match receiver.upgrade() {
            Some(r) => method(&r, args),
            None => Ok(()),
        })
    }

    pub fn mode(&self) -> CallbackMode {
        match self {
            Callback::EventOnly(_) => CallbackMode::EventOnly,
            Callback::DataFirst(_) => CallbackMode::DataFirst,
            Callback::Arguments(_) => CallbackMode::Arguments,
        }
    }

    /// Invoke with the argument shape of this callback's mode
    ///
    /// In arguments mode an array payload is spread, `null` yields no
    /// arguments and any other payload is passed as a single argument.
    pub(crate) fn invoke(&self, event: &ComponentEvent) -> eyre::Result<()> {
        match self {
            Callback::EventOnly(f) => f(event),
            Callback::DataFirst(f) => f(event.data(), event),
            Callback::Arguments(f) => match event.data() {
                Value::Array(items) => f(items),
                Value::Null => f(&[]),
                other => f(std::slice::from_ref(other)),
            },
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callback({:?})", self.mode())
    }
}
