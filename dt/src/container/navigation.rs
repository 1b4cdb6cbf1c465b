//! Navigation to parents and children, and the listen wrappers built on it

use std::rc::Rc;

use tracing::debug;

use super::Container;
use crate::dash::PublicDash;
use crate::emitter::ChildListenOptions;
use crate::error::{DashError, Result};
use crate::event::{Instance, Names};
use crate::id::ComponentKey;
use crate::transmitter::Transmitter;

/// Predicate over an ancestor, used by parent lookups
pub type ParentFilter<'a> = &'a dyn Fn(&PublicDash) -> bool;

type ChildPredicate = Rc<dyn Fn(&PublicDash) -> bool>;

/// Selection of direct children: an optional group filter plus an optional predicate
#[derive(Clone, Default)]
pub struct ChildQuery {
    groups: Option<Names>,
    predicate: Option<ChildPredicate>,
}

impl ChildQuery {
    /// Every direct child
    pub fn all() -> Self {
        Self::default()
    }

    /// Children in at least one of `groups`
    pub fn in_group(groups: impl Into<Names>) -> Self {
        Self {
            groups: Some(groups.into()),
            predicate: None,
        }
    }

    /// Narrow the selection with a predicate over each child's public dash
    pub fn filter(mut self, predicate: impl Fn(&PublicDash) -> bool + 'static) -> Self {
        self.predicate = Some(Rc::new(predicate));
        self
    }

    fn accepts(&self, child: &PublicDash) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(child))
    }
}

/// A bare string selects a group
impl From<&str> for ChildQuery {
    fn from(group: &str) -> Self {
        Self::in_group(group)
    }
}

impl std::fmt::Display for ChildQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.groups {
            Some(groups) => write!(f, "group={groups}")?,
            None => write!(f, "any")?,
        }
        if self.predicate.is_some() {
            write!(f, " (filtered)")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChildQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChildQuery({self})")
    }
}

impl Container {
    pub(crate) fn child_containers(&self, query: &ChildQuery) -> Result<Vec<Rc<Container>>> {
        self.check_alive()?;
        let app = self.app()?;
        let candidates: Vec<Rc<Container>> = match &query.groups {
            None => app.children_of(self.id),
            Some(groups) => self
                .group_members(groups)
                .into_iter()
                .filter_map(|id| app.container(id))
                .collect(),
        };
        Ok(candidates
            .into_iter()
            .filter(|child| query.accepts(&child.public_dash()))
            .collect())
    }

    pub(crate) fn children(&self, query: &ChildQuery) -> Result<Vec<Instance>> {
        self.child_containers(query)?
            .iter()
            .map(|child| child.instance())
            .collect()
    }

    /// The single child matching `query`
    pub(crate) fn get_child(&self, query: &ChildQuery) -> Result<Instance> {
        let mut found = self.child_containers(query)?;
        if found.len() != 1 {
            return Err(DashError::Ambiguity {
                parent: self.id,
                query: query.to_string(),
                found: found.len(),
            });
        }
        found.remove(0).instance()
    }

    pub(crate) fn count_children(&self, query: &ChildQuery) -> Result<usize> {
        Ok(self.child_containers(query)?.len())
    }

    pub(crate) fn has_children(&self, query: &ChildQuery) -> Result<bool> {
        Ok(self.count_children(query)? > 0)
    }

    pub(crate) fn is_child(&self, target: ComponentKey) -> Result<bool> {
        self.check_alive()?;
        let target = self.resolve(target)?;
        self.is_parent_of(target.id())
    }

    pub(crate) fn destroy_children(&self, query: &ChildQuery) -> Result<()> {
        let children = self.child_containers(query)?;
        debug!(component = %self.id, %query, count = children.len(), "Container::destroy_children: called");
        for child in children {
            child.destroy();
        }
        Ok(())
    }

    /// Nearest ancestor accepted by `filter`
    pub(crate) fn get_parent(&self, filter: Option<ParentFilter<'_>>) -> Result<Option<Rc<Container>>> {
        self.check_alive()?;
        let app = self.app()?;
        let mut current = self.id;
        while let Some(parent) = app.parent_of(current) {
            if filter.is_none_or(|f| f(&parent.public_dash())) {
                return Ok(Some(parent));
            }
            current = parent.id();
        }
        Ok(None)
    }

    /// Every ancestor accepted by `filter`, nearest first
    pub(crate) fn get_all_parents(&self, filter: Option<ParentFilter<'_>>) -> Result<Vec<Rc<Container>>> {
        self.check_alive()?;
        let app = self.app()?;
        let mut found = Vec::new();
        let mut current = self.id;
        while let Some(parent) = app.parent_of(current) {
            current = parent.id();
            if filter.is_none_or(|f| f(&parent.public_dash())) {
                found.push(parent);
            }
        }
        Ok(found)
    }

    /// Listen on the own emitter, without lifetime scoping
    pub(crate) fn listen(&self, names: Names) -> Result<Transmitter> {
        self.check_alive()?;
        self.emitter().listen(names, None)
    }

    /// Listen on the nearest matching parent, scoped to this component's lifetime
    ///
    /// Without a parent: the empty transmitter if no filter was given,
    /// [`DashError::FilteredParentNotFound`] otherwise.
    pub(crate) fn listen_to_parent(&self, names: Names, filter: Option<ParentFilter<'_>>) -> Result<Transmitter> {
        match self.get_parent(filter)? {
            Some(parent) => parent.emitter().listen(names, Some(self.emitter())),
            None if filter.is_some() => Err(DashError::FilteredParentNotFound { id: self.id }),
            None => Ok(Transmitter::empty()),
        }
    }

    pub(crate) fn listen_to_all_parents(&self, names: Names, filter: Option<ParentFilter<'_>>) -> Result<Transmitter> {
        let transmitters = self
            .get_all_parents(filter)?
            .iter()
            .map(|parent| parent.emitter().listen(names.clone(), Some(self.emitter())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Transmitter::multi(transmitters))
    }

    /// Listen on an arbitrary component, scoped to this component's lifetime
    pub(crate) fn listen_to(&self, target: ComponentKey, names: Names) -> Result<Transmitter> {
        self.check_alive()?;
        let target = self.resolve(target)?;
        debug!(component = %self.id, target = %target.id(), %names, "Container::listen_to: called");
        target.emitter().listen(names, Some(self.emitter()))
    }

    pub(crate) fn listen_to_children(&self, names: Names, options: ChildListenOptions) -> Result<Transmitter> {
        self.check_alive()?;
        self.child_emitter().listen(names, options)
    }
}
