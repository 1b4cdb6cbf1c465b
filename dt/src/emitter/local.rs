//! Emitter - a component's own event dispatch

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use super::table::DispatchCore;
use crate::app::ErrorSink;
use crate::error::{DashError, Result};
use crate::event::{ComponentEvent, DESTROY_EVENT, Names};
use crate::id::ComponentId;
use crate::transmitter::{Subscribe, Transmitter};

/// Name-scoped publish/subscribe for one component's own events
pub struct Emitter {
    core: Rc<DispatchCore<()>>,
    exposed: RefCell<HashSet<String>>,
    strict: Cell<bool>,
}

impl Emitter {
    /// Create an emitter whose allow-list starts with `exposed` (non-strict)
    pub(crate) fn new(owner: ComponentId, errors: ErrorSink, exposed: &[&str]) -> Self {
        Self {
            core: DispatchCore::new(owner, errors),
            exposed: RefCell::new(exposed.iter().map(|n| n.to_string()).collect()),
            strict: Cell::new(false),
        }
    }

    pub fn owner(&self) -> ComponentId {
        self.core.owner()
    }

    pub fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    fn check_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(DashError::DestroyedComponent { id: self.owner() });
        }
        Ok(())
    }

    /// Add names to the allow-list; `strict` makes it exhaustive for future emits
    pub fn expose_events(&self, names: impl Into<Names>, strict: bool) -> Result<()> {
        self.check_alive()?;
        let names = names.into();
        debug!(component = %self.owner(), %names, strict, "Emitter::expose_events: called");
        self.exposed.borrow_mut().extend(names.into_vec());
        if strict {
            self.strict.set(true);
        }
        Ok(())
    }

    pub fn is_strict(&self) -> bool {
        self.strict.get()
    }

    pub fn is_exposed(&self, event: &str) -> bool {
        self.exposed.borrow().contains(event)
    }

    /// Fail with [`DashError::UnexposedEvent`] if strict mode forbids `event`
    pub fn check_exposed(&self, event: &str) -> Result<()> {
        if self.strict.get() && !self.is_exposed(event) {
            return Err(DashError::UnexposedEvent {
                event: event.to_string(),
            });
        }
        Ok(())
    }

    /// Register a subscription for one or several event names
    ///
    /// With `from`, the returned transmitter also disables itself when the
    /// component owning `from` is destroyed.
    pub fn listen(&self, names: impl Into<Names>, from: Option<&Emitter>) -> Result<Transmitter> {
        self.check_alive()?;
        let names = names.into();
        let subscription = self.core.subscribe(names.into_vec(), ());
        let transmitter = Transmitter::single(subscription.clone());

        if let Some(from) = from {
            // The canceler keeps the subscription alive even if the caller drops the transmitter
            let watched = Rc::clone(&subscription);
            let on_destroy = from
                .listen(DESTROY_EVENT, None)
                .map_err(|_| DashError::UnlistenableTarget { id: from.owner() })?;
            on_destroy.on_event(move |_| {
                watched.disable();
                Ok(())
            });

            debug!(component = %self.owner(), from = %from.owner(), "Emitter::listen: installing canceler");
            let held = self.core.hold_canceler(on_destroy.clone());
            let core = Rc::downgrade(&self.core);
            subscription.set_canceler(Box::new(move || {
                on_destroy.disable();
                if let (Some(core), Some(id)) = (core.upgrade(), held) {
                    core.release_canceler(id);
                }
            }));
        }

        Ok(transmitter)
    }

    /// Deliver to every live callback; no-op once destroyed
    pub fn emit(&self, event: &ComponentEvent) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        self.check_exposed(event.name())?;
        debug!(component = %self.owner(), event = event.name(), "Emitter::emit: called");
        self.core.dispatch(event, |_| true);
        Ok(())
    }

    /// Number of live callbacks registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.core.listener_count(event)
    }

    /// Disable held cancelers and free all maps. Idempotent.
    pub fn destroy(&self) {
        self.core.destroy();
        self.exposed.borrow_mut().clear();
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("owner", &self.owner())
            .field("strict", &self.strict.get())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Application, LogErrorHandler};
    use serde_json::Value;

    struct Probe;

    fn sink() -> ErrorSink {
        ErrorSink::new(Rc::new(LogErrorHandler), true)
    }

    fn event(app: &Application, name: &str) -> ComponentEvent {
        let probe = app.create_root(|_| Probe).unwrap();
        let container = app.container_of(&probe).unwrap();
        ComponentEvent::new(name, Value::Null, &container)
    }

    #[test]
    fn test_strict_mode_rejects_unexposed() {
        let app = Application::default();
        let emitter = Emitter::new(ComponentId::new(1), sink(), &[DESTROY_EVENT]);
        emitter.expose_events(["x"], true).unwrap();

        assert!(emitter.emit(&event(&app, "x")).is_ok());
        let app = Application::default();
        assert_eq!(
            emitter.emit(&event(&app, "y")),
            Err(DashError::UnexposedEvent { event: "y".to_string() })
        );
        assert!(emitter.check_exposed(DESTROY_EVENT).is_ok());
    }

    #[test]
    fn test_non_strict_allows_anything() {
        let emitter = Emitter::new(ComponentId::new(1), sink(), &[]);
        emitter.expose_events(["x", "x"], false).unwrap();
        assert!(!emitter.is_strict());
        assert!(emitter.check_exposed("anything").is_ok());
    }

    #[test]
    fn test_listen_after_destroy_fails() {
        let emitter = Emitter::new(ComponentId::new(9), sink(), &[]);
        emitter.destroy();
        emitter.destroy();
        assert_eq!(
            emitter.listen("x", None).unwrap_err(),
            DashError::DestroyedComponent { id: ComponentId::new(9) }
        );
        assert!(emitter.expose_events("x", false).is_err());
    }

    #[test]
    fn test_from_scoped_listen_dies_with_from() {
        let app = Application::default();
        let target = Emitter::new(ComponentId::new(1), sink(), &[DESTROY_EVENT]);
        let listener = Emitter::new(ComponentId::new(2), sink(), &[DESTROY_EVENT]);

        let t = target.listen("tick", Some(&listener)).unwrap();
        t.on_event(|_| Ok(()));
        assert_eq!(target.listener_count("tick"), 1);
        assert_eq!(listener.listener_count(DESTROY_EVENT), 1);

        listener.emit(&event(&app, DESTROY_EVENT)).unwrap();
        assert!(t.is_disabled());
        assert_eq!(target.listener_count("tick"), 0);
        assert_eq!(listener.listener_count(DESTROY_EVENT), 0);
    }

    #[test]
    fn test_emitter_destroy_releases_canceler_on_from() {
        let target = Emitter::new(ComponentId::new(1), sink(), &[DESTROY_EVENT]);
        let listener = Emitter::new(ComponentId::new(2), sink(), &[DESTROY_EVENT]);

        let t = target.listen("tick", Some(&listener)).unwrap();
        t.on_event(|_| Ok(()));
        assert_eq!(listener.listener_count(DESTROY_EVENT), 1);

        target.destroy();
        assert!(t.is_disabled());
        assert_eq!(listener.listener_count(DESTROY_EVENT), 0);
    }

    #[test]
    fn test_listen_from_destroyed_target_is_unlistenable() {
        let target = Emitter::new(ComponentId::new(1), sink(), &[]);
        let from = Emitter::new(ComponentId::new(2), sink(), &[]);
        from.destroy();
        assert_eq!(
            target.listen("tick", Some(&from)).unwrap_err(),
            DashError::UnlistenableTarget { id: ComponentId::new(2) }
        );
    }
}
