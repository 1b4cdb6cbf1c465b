//! Emission and the bubbling walk
//!
//! One emission builds one event record, delivers it on the local emitter,
//! then visits each ancestor in turn. The walk checks the stop flag before
//! every ancestor, so a stop at level k keeps levels 1..k delivered and
//! skips k+1..root.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, warn};

use super::Container;
use crate::error::Result;
use crate::event::{ComponentEvent, Delivery, Names};
use crate::id::ComponentId;

impl Container {
    /// Emit `name` with `data`; strict mode is checked before scheduling
    pub(crate) fn emit(&self, name: &str, data: Value, delivery: Delivery) -> Result<()> {
        self.check_alive()?;
        self.emitter().check_exposed(name)?;
        match delivery {
            Delivery::Sync => {
                let event = ComponentEvent::new(name, data, &self.rc()?);
                self.emit_now(&event)
            }
            Delivery::Deferred => {
                let app = self.app()?;
                let weak = self.this.clone();
                let name = name.to_string();
                debug!(component = %self.id, event = %name, "Container::emit: deferred");
                app.schedule(Box::new(move || {
                    let Some(container) = weak.upgrade() else {
                        return;
                    };
                    if !container.is_alive() {
                        return;
                    }
                    let event = ComponentEvent::new(&name, data, &container);
                    if let Err(err) = container.emit_now(&event) {
                        warn!(component = %container.id(), event = %name, %err, "Container::emit: deferred emission failed");
                    }
                }));
                Ok(())
            }
        }
    }

    /// Emit one record per name, in order
    pub(crate) fn emit_all(&self, names: Names, data: Value, delivery: Delivery) -> Result<()> {
        for name in names.iter() {
            self.emit(name, data.clone(), delivery)?;
        }
        Ok(())
    }

    /// Re-deliver an existing record on the local emitter only
    pub(crate) fn broadcast(&self, event: &ComponentEvent, delivery: Delivery) -> Result<()> {
        self.check_alive()?;
        self.emitter().check_exposed(event.name())?;
        match delivery {
            Delivery::Sync => self.emitter().emit(event),
            Delivery::Deferred => {
                let app = self.app()?;
                let weak = self.this.clone();
                let event = event.clone();
                app.schedule(Box::new(move || {
                    if let Some(container) = weak.upgrade()
                        && let Err(err) = container.emitter().emit(&event)
                    {
                        warn!(component = %container.id(), event = event.name(), %err, "Container::broadcast: deferred broadcast failed");
                    }
                }));
                Ok(())
            }
        }
    }

    /// Local delivery, then the ancestor walk
    pub(crate) fn emit_now(&self, event: &ComponentEvent) -> Result<()> {
        event.set_from_deep(false);
        self.emitter().emit(event)?;

        let Some(app) = self.app.upgrade() else {
            return Ok(());
        };
        let mut child = self.id;
        let mut is_from_deep = false;
        while let Some(parent) = app.parent_of(child) {
            if !event.is_propagation_allowed() {
                debug!(component = %self.id, event = event.name(), stopped_at = %parent.id(), "Container::emit_now: propagation stopped");
                break;
            }
            parent.bubble_up_event(event, is_from_deep, child);
            child = parent.id();
            is_from_deep = true;
        }
        Ok(())
    }

    /// Dispatch on this ancestor's child emitter with the groups `child` holds here
    fn bubble_up_event(&self, event: &ComponentEvent, is_from_deep: bool, child: ComponentId) {
        let groups: BTreeSet<String> = self.groups_of(child);
        event.set_from_deep(is_from_deep);
        self.child_emitter().emit(event, is_from_deep, &groups);
    }
}
