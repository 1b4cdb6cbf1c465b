//! Transmitter - disposable subscription handle
//!
//! A transmitter is returned by every listen operation. Callbacks are
//! attached to it (several may share one transmitter) and `disable()`
//! revokes all of them at once. Three shapes exist:
//! - a single subscription on one emitter
//! - the empty transmitter, a no-op returned when there is nothing to listen to
//! - a multi-transmitter fanning `call`/`disable` out to several transmitters

use std::rc::Rc;

use serde_json::Value;

use crate::callback::Callback;
use crate::event::ComponentEvent;

/// The subscription side a transmitter drives
pub(crate) trait Subscribe {
    fn attach(&self, callback: Callback);
    fn disable(&self);
    fn is_disabled(&self) -> bool;
}

#[derive(Clone)]
enum Kind {
    Empty,
    Single(Rc<dyn Subscribe>),
    Multi(Rc<[Transmitter]>),
}

/// Handle to one listen registration
#[derive(Clone)]
pub struct Transmitter {
    kind: Kind,
}

impl Transmitter {
    /// A transmitter that accepts callbacks and never delivers
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    pub(crate) fn single(subscription: Rc<dyn Subscribe>) -> Self {
        Self {
            kind: Kind::Single(subscription),
        }
    }

    /// Aggregate several transmitters behind one handle
    pub fn multi(transmitters: Vec<Transmitter>) -> Self {
        Self {
            kind: Kind::Multi(transmitters.into()),
        }
    }

    /// Attach a callback; attaching to a disabled transmitter is a no-op
    pub fn call(&self, callback: Callback) -> &Self {
        match &self.kind {
            Kind::Empty => {}
            Kind::Single(sub) => sub.attach(callback),
            Kind::Multi(list) => {
                for t in list.iter() {
                    t.call(callback.clone());
                }
            }
        }
        self
    }

    pub fn on_event(&self, f: impl Fn(&ComponentEvent) -> eyre::Result<()> + 'static) -> &Self {
        self.call(Callback::event_only(f))
    }

    pub fn on_data(&self, f: impl Fn(&Value, &ComponentEvent) -> eyre::Result<()> + 'static) -> &Self {
        self.call(Callback::data_first(f))
    }

    pub fn on_args(&self, f: impl Fn(&[Value]) -> eyre::Result<()> + 'static) -> &Self {
        self.call(Callback::arguments(f))
    }

    pub fn bind_event<R: 'static>(&self, receiver: &Rc<R>, method: fn(&R, &ComponentEvent) -> eyre::Result<()>) -> &Self {
        self.call(Callback::bound_event(receiver, method))
    }

    pub fn bind_data<R: 'static>(
        &self,
        receiver: &Rc<R>,
        method: fn(&R, &Value, &ComponentEvent) -> eyre::Result<()>,
    ) -> &Self {
        self.call(Callback::bound_data(receiver, method))
    }

    /// Revoke every callback attached through this handle. Idempotent.
    pub fn disable(&self) {
        match &self.kind {
            Kind::Empty => {}
            Kind::Single(sub) => sub.disable(),
            Kind::Multi(list) => {
                for t in list.iter() {
                    t.disable();
                }
            }
        }
    }

    /// The empty transmitter always reports `false`; a multi-transmitter
    /// reports `true` once every member is disabled.
    pub fn is_disabled(&self) -> bool {
        match &self.kind {
            Kind::Empty => false,
            Kind::Single(sub) => sub.is_disabled(),
            Kind::Multi(list) => list.iter().all(Transmitter::is_disabled),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::Empty)
    }
}

impl std::fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            Kind::Empty => "empty".to_string(),
            Kind::Single(_) => "single".to_string(),
            Kind::Multi(list) => format!("multi({})", list.len()),
        };
        f.debug_struct("Transmitter")
            .field("kind", &kind)
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct CountingSubscription {
        attached: RefCell<Vec<Callback>>,
        disabled: Cell<u32>,
    }

    impl Subscribe for CountingSubscription {
        fn attach(&self, callback: Callback) {
            if self.disabled.get() == 0 {
                self.attached.borrow_mut().push(callback);
            }
        }

        fn disable(&self) {
            self.disabled.set(self.disabled.get() + 1);
        }

        fn is_disabled(&self) -> bool {
            self.disabled.get() > 0
        }
    }

    #[test]
    fn test_empty_transmitter_chains() {
        let t = Transmitter::empty();
        t.on_event(|_| Ok(())).on_data(|_, _| Ok(())).disable();
        assert!(t.is_empty());
        assert!(!t.is_disabled());
    }

    #[test]
    fn test_multi_fans_out() {
        let a = Rc::new(CountingSubscription::default());
        let b = Rc::new(CountingSubscription::default());
        let multi = Transmitter::multi(vec![Transmitter::single(a.clone()), Transmitter::single(b.clone())]);

        multi.on_event(|_| Ok(())).on_args(|_| Ok(()));
        assert_eq!(a.attached.borrow().len(), 2);
        assert_eq!(b.attached.borrow().len(), 2);

        assert!(!multi.is_disabled());
        multi.disable();
        assert!(multi.is_disabled());
        assert_eq!(a.disabled.get(), 1);
        assert_eq!(b.disabled.get(), 1);
    }

    #[test]
    fn test_single_attach_after_disable_is_ignored() {
        let sub = Rc::new(CountingSubscription::default());
        let t = Transmitter::single(sub.clone());
        t.disable();
        t.on_event(|_| Ok(()));
        assert!(sub.attached.borrow().is_empty());
    }
}
