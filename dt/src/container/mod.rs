//! Container - per-component control object
//!
//! A container owns one [`Emitter`] for the component's own events and one
//! [`ChildEmitter`] for events bubbling up from its descendants. It keeps the
//! group table of its direct children, walks the ancestor chain when an event
//! bubbles, and runs the destroy cascade.
//!
//! Destruction order:
//! 1. emit a synchronous `destroy` event (it bubbles; the instance is still reachable)
//! 2. the application unlinks the component, destroying its descendants first
//!    and purging its id from the parent's groups
//! 3. clear the own group table
//! 4. destroy both emitters, which disables every outstanding transmitter
//! 5. drop the instance

mod bubble;
mod groups;
mod navigation;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

pub use navigation::{ChildQuery, ParentFilter};

use crate::app::{AppCore, ErrorSink};
use crate::dash::{Dash, PublicDash};
use crate::emitter::{ChildEmitter, Emitter};
use crate::error::{DashError, Result};
use crate::event::{DESTROY_EVENT, Instance};
use crate::id::{ComponentId, ComponentKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Alive,
    /// The destroy event is being delivered; re-entrant destroys are ignored
    Destroying,
    Destroyed,
}

pub struct Container {
    id: ComponentId,
    app: Weak<AppCore>,
    this: Weak<Container>,
    emitter: Emitter,
    child_emitter: ChildEmitter,
    instance: RefCell<Option<Instance>>,
    /// group name -> ids of direct children
    groups: RefCell<BTreeMap<String, BTreeSet<ComponentId>>>,
    phase: Cell<Phase>,
    dash: Dash,
}

impl Container {
    pub(crate) fn new(id: ComponentId, app: Weak<AppCore>, errors: ErrorSink, root: Option<Weak<Container>>) -> Rc<Self> {
        debug!(component = %id, "Container::new: called");
        Rc::new_cyclic(|this| Self {
            id,
            app,
            this: this.clone(),
            emitter: Emitter::new(id, errors.clone(), &[DESTROY_EVENT]),
            child_emitter: ChildEmitter::new(id, errors),
            instance: RefCell::new(None),
            groups: RefCell::new(BTreeMap::new()),
            phase: Cell::new(Phase::Alive),
            dash: Dash::new(PublicDash::new(id, this.clone()), root),
        })
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.phase.get() != Phase::Destroyed
    }

    pub(crate) fn check_alive(&self) -> Result<()> {
        if !self.is_alive() {
            return Err(DashError::DestroyedComponent { id: self.id });
        }
        Ok(())
    }

    pub(crate) fn app(&self) -> Result<Rc<AppCore>> {
        self.app
            .upgrade()
            .ok_or(DashError::DestroyedComponent { id: self.id })
    }

    fn rc(&self) -> Result<Rc<Container>> {
        self.this
            .upgrade()
            .ok_or(DashError::DestroyedComponent { id: self.id })
    }

    pub(crate) fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub(crate) fn child_emitter(&self) -> &ChildEmitter {
        &self.child_emitter
    }

    pub(crate) fn dash(&self) -> Dash {
        self.dash.clone()
    }

    pub(crate) fn public_dash(&self) -> PublicDash {
        self.dash.public_dash()
    }

    /// The component object
    ///
    /// Fails with [`DashError::UninitializedInstance`] before the instance is
    /// set and with [`DashError::DestroyedComponent`] after destruction.
    pub fn instance(&self) -> Result<Instance> {
        self.check_alive()?;
        self.instance
            .borrow()
            .clone()
            .ok_or(DashError::UninitializedInstance { id: self.id })
    }

    /// Set or replace the backing instance and re-index it
    pub(crate) fn set_instance(&self, instance: Instance) -> Result<()> {
        self.check_alive()?;
        let app = self.app()?;
        app.index_instance(self.id, ComponentKey::of_instance(&instance));
        let replaced = self.instance.borrow_mut().replace(instance);
        drop(replaced);
        debug!(component = %self.id, "Container::set_instance: done");
        Ok(())
    }

    /// Add names to the emitter's allow-list, strict per the application config
    pub(crate) fn expose_events(&self, names: crate::event::Names) -> Result<()> {
        self.check_alive()?;
        let strict = self.app()?.config().strict_events;
        self.emitter.expose_events(names, strict)
    }

    /// Tear the component down. Idempotent; calls made while the destroy
    /// event is being delivered are ignored.
    pub fn destroy(&self) {
        if self.phase.get() != Phase::Alive {
            return;
        }
        self.phase.set(Phase::Destroying);
        debug!(component = %self.id, "Container::destroy: called");

        if let Ok(this) = self.rc() {
            let event = crate::event::ComponentEvent::new(DESTROY_EVENT, serde_json::Value::Null, &this);
            if let Err(err) = self.emit_now(&event) {
                warn!(component = %self.id, %err, "Container::destroy: destroy event not delivered");
            }
        }
        if let Some(app) = self.app.upgrade() {
            app.remove_component(self.id);
        }
        self.groups.borrow_mut().clear();
        self.emitter.destroy();
        self.child_emitter.destroy();
        self.phase.set(Phase::Destroyed);

        let instance = self.instance.borrow_mut().take();
        drop(instance);
        debug!(component = %self.id, "Container::destroy: done");
    }

    /// Create a child component from a factory receiving the child's dash
    pub(crate) fn create_child<C: std::any::Any>(&self, factory: impl FnOnce(Dash) -> C) -> Result<Rc<C>> {
        self.check_alive()?;
        self.app()?.build(Some(self.id), factory)
    }

    /// Adopt an existing object as a child component
    pub(crate) fn adopt_child(&self, object: Instance) -> Result<Dash> {
        self.check_alive()?;
        self.app()?.adopt(Some(self.id), object)
    }

    /// Resolve a target through the application, failing for non-components
    pub(crate) fn resolve(&self, key: ComponentKey) -> Result<Rc<Container>> {
        self.app()?.resolve(key).ok_or(DashError::NotAComponent)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("phase", &self.phase.get())
            .field("groups", &self.groups.borrow().len())
            .finish()
    }
}
