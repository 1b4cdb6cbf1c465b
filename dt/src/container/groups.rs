//! Group bookkeeping over direct children
//!
//! Groups are per parent and never transitive: a grandchild is not a member
//! of any group of its grandparent.

use std::collections::BTreeSet;

use tracing::debug;

use super::Container;
use crate::error::{DashError, Result};
use crate::event::Names;
use crate::id::{ComponentId, ComponentKey};

impl Container {
    /// Union-insert a current direct child into each named group
    pub(crate) fn add_to_group(&self, child: ComponentKey, groups: Names) -> Result<()> {
        self.check_alive()?;
        let child = self.resolve(child)?;
        if !self.is_parent_of(child.id())? {
            return Err(DashError::NotAChild {
                parent: self.id,
                child: child.id(),
            });
        }
        debug!(component = %self.id, child = %child.id(), %groups, "Container::add_to_group: called");
        let mut table = self.groups.borrow_mut();
        for group in groups.iter() {
            table.entry(group.to_string()).or_default().insert(child.id());
        }
        Ok(())
    }

    /// Take a child out of each named group; unknown groups are ignored
    pub(crate) fn remove_from_group(&self, child: ComponentKey, groups: Names) -> Result<()> {
        self.check_alive()?;
        let child = self.resolve(child)?.id();
        let mut table = self.groups.borrow_mut();
        for group in groups.iter() {
            if let Some(ids) = table.get_mut(group) {
                ids.remove(&child);
            }
        }
        table.retain(|_, ids| !ids.is_empty());
        Ok(())
    }

    /// Whether `child` is in at least one of `groups`
    pub(crate) fn is_in_group(&self, child: ComponentKey, groups: &Names) -> Result<bool> {
        self.check_alive()?;
        let child = self.resolve(child)?.id();
        let table = self.groups.borrow();
        Ok(groups
            .iter()
            .any(|group| table.get(group).is_some_and(|ids| ids.contains(&child))))
    }

    /// Names of the groups `child` holds in this container
    pub(crate) fn groups_of(&self, child: ComponentId) -> BTreeSet<String> {
        self.groups
            .borrow()
            .iter()
            .filter(|(_, ids)| ids.contains(&child))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Ids of the children in at least one of `groups`, in id order
    pub(crate) fn group_members(&self, groups: &Names) -> BTreeSet<ComponentId> {
        let table = self.groups.borrow();
        groups
            .iter()
            .filter_map(|group| table.get(group))
            .flat_map(|ids| ids.iter().copied())
            .collect()
    }

    /// Purge a removed child's id from every group
    pub(crate) fn forget_child(&self, child: ComponentId) {
        debug!(component = %self.id, %child, "Container::forget_child: called");
        let mut table = self.groups.borrow_mut();
        for ids in table.values_mut() {
            ids.remove(&child);
        }
        table.retain(|_, ids| !ids.is_empty());
    }

    pub(crate) fn is_parent_of(&self, child: ComponentId) -> Result<bool> {
        Ok(self
            .app()?
            .parent_of(child)
            .is_some_and(|parent| parent.id() == self.id))
    }
}
