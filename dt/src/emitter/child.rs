//! ChildEmitter - dispatch of events bubbling up from descendants

use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::debug;

use super::table::DispatchCore;
use crate::app::ErrorSink;
use crate::error::{DashError, Result};
use crate::event::{ComponentEvent, Names};
use crate::id::ComponentId;
use crate::transmitter::Transmitter;

/// Filters applied to a child listener
#[derive(Debug, Clone, Default)]
pub struct ChildListenOptions {
    /// Only events whose origin (relative to this container) is in one of these groups
    pub groups: Option<Names>,
    /// Only events coming from a direct child
    pub direct_only: bool,
}

impl ChildListenOptions {
    pub fn in_group(groups: impl Into<Names>) -> Self {
        Self {
            groups: Some(groups.into()),
            direct_only: false,
        }
    }

    pub fn direct_only(mut self) -> Self {
        self.direct_only = true;
        self
    }

    fn accepts(&self, is_from_deep: bool, origin_groups: &BTreeSet<String>) -> bool {
        if self.direct_only && is_from_deep {
            return false;
        }
        match &self.groups {
            None => true,
            Some(groups) => groups.iter().any(|g| origin_groups.contains(g)),
        }
    }
}

/// Dispatch core for events bubbled from descendants
pub struct ChildEmitter {
    core: Rc<DispatchCore<Rc<ChildListenOptions>>>,
}

impl ChildEmitter {
    pub(crate) fn new(owner: ComponentId, errors: ErrorSink) -> Self {
        Self {
            core: DispatchCore::new(owner, errors),
        }
    }

    pub fn owner(&self) -> ComponentId {
        self.core.owner()
    }

    pub fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    pub fn listen(&self, names: impl Into<Names>, options: ChildListenOptions) -> Result<Transmitter> {
        if self.is_destroyed() {
            return Err(DashError::DestroyedComponent { id: self.owner() });
        }
        let names = names.into();
        debug!(component = %self.owner(), %names, ?options, "ChildEmitter::listen: called");
        let subscription = self.core.subscribe(names.into_vec(), Rc::new(options));
        Ok(Transmitter::single(subscription))
    }

    /// Deliver to listeners whose filters accept the origin's depth and groups
    ///
    /// `origin_groups` are the groups the direct child on the bubbling path
    /// holds in this container, not the groups of the emitting component.
    pub fn emit(&self, event: &ComponentEvent, is_from_deep: bool, origin_groups: &BTreeSet<String>) {
        if self.is_destroyed() {
            return;
        }
        debug!(
            component = %self.owner(),
            event = event.name(),
            is_from_deep,
            groups = ?origin_groups,
            "ChildEmitter::emit: called"
        );
        self.core
            .dispatch(event, |options| options.accepts(is_from_deep, origin_groups));
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.core.listener_count(event)
    }

    pub fn destroy(&self) {
        self.core.destroy();
    }
}

impl std::fmt::Debug for ChildEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildEmitter")
            .field("owner", &self.owner())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
