//! Dispatch core shared by [`Emitter`](super::Emitter) and [`ChildEmitter`](super::ChildEmitter)
//!
//! Callbacks live in a per-event-name arena keyed by monotonically growing
//! ids. Removing a callback leaves a hole: ids are never shifted nor reused,
//! so a transmitter can always revoke exactly what it registered, even after
//! a destroy cascade removed entries around it.
//!
//! Dispatch walks the arena by id up to the bound captured when the walk
//! starts, re-reading each slot and releasing the borrow before calling the
//! listener. Listeners may therefore listen, disable or emit re-entrantly.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::app::ErrorSink;
use crate::callback::Callback;
use crate::event::ComponentEvent;
use crate::id::ComponentId;
use crate::transmitter::{Subscribe, Transmitter};

struct Slot<F> {
    callback: Callback,
    filter: F,
}

struct CallbackList<F> {
    next_id: usize,
    slots: BTreeMap<usize, Rc<Slot<F>>>,
}

impl<F> Default for CallbackList<F> {
    fn default() -> Self {
        Self {
            next_id: 0,
            slots: BTreeMap::new(),
        }
    }
}

struct CoreState<F> {
    lists: HashMap<String, CallbackList<F>>,
    /// Transmitters this core registered on other components' destroy events
    cancelers: BTreeMap<usize, Transmitter>,
    next_canceler: usize,
}

pub(crate) struct DispatchCore<F> {
    owner: ComponentId,
    errors: ErrorSink,
    /// `None` once destroyed
    state: RefCell<Option<CoreState<F>>>,
}

impl<F: Clone + 'static> DispatchCore<F> {
    pub(crate) fn new(owner: ComponentId, errors: ErrorSink) -> Rc<Self> {
        Rc::new(Self {
            owner,
            errors,
            state: RefCell::new(Some(CoreState {
                lists: HashMap::new(),
                cancelers: BTreeMap::new(),
                next_canceler: 0,
            })),
        })
    }

    pub(crate) fn owner(&self) -> ComponentId {
        self.owner
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.state.borrow().is_none()
    }

    /// Create an active subscription for `names`, not yet carrying callbacks
    pub(crate) fn subscribe(self: &Rc<Self>, names: Vec<String>, filter: F) -> Rc<Subscription<F>> {
        debug!(component = %self.owner, names = ?names, "DispatchCore::subscribe: called");
        Rc::new(Subscription {
            core: Rc::downgrade(self),
            names,
            filter,
            ids: RefCell::new(Some(Vec::new())),
            canceler: RefCell::new(None),
        })
    }

    fn insert(&self, event: &str, callback: Callback, filter: F) -> Option<usize> {
        let mut state = self.state.borrow_mut();
        let list = state.as_mut()?.lists.entry(event.to_string()).or_default();
        let id = list.next_id;
        list.next_id += 1;
        list.slots.insert(id, Rc::new(Slot { callback, filter }));
        Some(id)
    }

    fn remove(&self, event: &str, id: usize) {
        if let Some(state) = self.state.borrow_mut().as_mut()
            && let Some(list) = state.lists.get_mut(event)
        {
            list.slots.remove(&id);
        }
    }

    /// Keep a cross-component canceler alive until disabled or until this core dies
    pub(crate) fn hold_canceler(&self, canceler: Transmitter) -> Option<usize> {
        let mut state = self.state.borrow_mut();
        let state = state.as_mut()?;
        let id = state.next_canceler;
        state.next_canceler += 1;
        state.cancelers.insert(id, canceler);
        Some(id)
    }

    pub(crate) fn release_canceler(&self, id: usize) {
        if let Some(state) = self.state.borrow_mut().as_mut() {
            state.cancelers.remove(&id);
        }
    }

    /// Number of live callbacks registered for `event`
    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.state
            .borrow()
            .as_ref()
            .and_then(|s| s.lists.get(event))
            .map_or(0, |l| l.slots.len())
    }

    /// Deliver `event` to every live callback whose filter is accepted
    pub(crate) fn dispatch(&self, event: &ComponentEvent, accept: impl Fn(&F) -> bool) {
        let upper = {
            let state = self.state.borrow();
            match state.as_ref().and_then(|s| s.lists.get(event.name())) {
                Some(list) => list.next_id,
                None => return,
            }
        };

        let mut cursor = 0;
        while cursor < upper {
            let next = {
                let state = self.state.borrow();
                let Some(state) = state.as_ref() else {
                    return;
                };
                state
                    .lists
                    .get(event.name())
                    .and_then(|l| l.slots.range(cursor..upper).next())
                    .map(|(id, slot)| (*id, Rc::clone(slot)))
            };
            let Some((id, slot)) = next else {
                break;
            };
            cursor = id + 1;

            if accept(&slot.filter) {
                let callback = slot.callback.clone();
                self.errors
                    .guard(self.owner, event.name(), || callback.invoke(event));
            }
        }
    }

    /// Disable every held canceler, then free all maps
    pub(crate) fn destroy(&self) {
        let Some(state) = self.state.borrow_mut().take() else {
            return;
        };
        debug!(component = %self.owner, cancelers = state.cancelers.len(), "DispatchCore::destroy: called");
        for canceler in state.cancelers.values() {
            canceler.disable();
        }
    }
}

type Canceler = Box<dyn FnOnce()>;

/// One listen registration on a [`DispatchCore`]
pub(crate) struct Subscription<F> {
    core: Weak<DispatchCore<F>>,
    names: Vec<String>,
    filter: F,
    /// Registered `(event, id)` pairs; `None` once disabled
    ids: RefCell<Option<Vec<(String, usize)>>>,
    canceler: RefCell<Option<Canceler>>,
}

impl<F> Subscription<F> {
    pub(crate) fn set_canceler(&self, canceler: Canceler) {
        *self.canceler.borrow_mut() = Some(canceler);
    }
}

impl<F: Clone + 'static> Subscribe for Subscription<F> {
    fn attach(&self, callback: Callback) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let mut ids = self.ids.borrow_mut();
        let Some(ids) = ids.as_mut() else {
            return;
        };
        for name in &self.names {
            if let Some(id) = core.insert(name, callback.clone(), self.filter.clone()) {
                ids.push((name.clone(), id));
            }
        }
    }

    fn disable(&self) {
        let Some(ids) = self.ids.borrow_mut().take() else {
            return;
        };
        if let Some(core) = self.core.upgrade() {
            for (name, id) in &ids {
                core.remove(name, *id);
            }
        }
        let canceler = self.canceler.borrow_mut().take();
        if let Some(cancel) = canceler {
            cancel();
        }
    }

    fn is_disabled(&self) -> bool {
        if self.ids.borrow().is_none() {
            return true;
        }
        self.core.upgrade().is_none_or(|core| core.is_destroyed())
    }
}
