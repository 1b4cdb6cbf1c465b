//! AppCore - tree authority shared by every container
//!
//! Owns the parent/child edges, allocates ids, resolves instances back to
//! their containers and hands deferred units to the scheduler. Containers
//! reach it through a weak reference.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info};

use super::errors::ErrorSink;
use super::scheduler::{Scheduler, Task};
use crate::config::AppConfig;
use crate::container::Container;
use crate::dash::Dash;
use crate::error::{DashError, Result};
use crate::event::Instance;
use crate::id::{ComponentId, ComponentKey};

struct Node {
    container: Rc<Container>,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    /// Key of the current instance in `Tree::by_instance`
    instance: Option<ComponentKey>,
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<ComponentId, Node>,
    by_instance: HashMap<ComponentKey, ComponentId>,
    next_id: u64,
    root: Option<ComponentId>,
}

pub(crate) struct AppCore {
    config: AppConfig,
    scheduler: Rc<dyn Scheduler>,
    errors: ErrorSink,
    tree: RefCell<Tree>,
}

impl AppCore {
    pub(crate) fn new(config: AppConfig, scheduler: Rc<dyn Scheduler>, errors: ErrorSink) -> Rc<Self> {
        Rc::new(Self {
            config,
            scheduler,
            errors,
            tree: RefCell::new(Tree {
                next_id: 1,
                ..Default::default()
            }),
        })
    }

    pub(crate) fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.scheduler)
    }

    pub(crate) fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    pub(crate) fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }

    pub(crate) fn root(&self) -> Option<Rc<Container>> {
        let tree = self.tree.borrow();
        tree.root
            .and_then(|id| tree.nodes.get(&id))
            .map(|node| Rc::clone(&node.container))
    }

    /// Allocate an id, build a container and link it under `parent`
    ///
    /// Without a parent the new container becomes the root.
    pub(crate) fn create_component(self: &Rc<Self>, parent: Option<ComponentId>) -> Result<Rc<Container>> {
        let (id, root) = {
            let mut tree = self.tree.borrow_mut();
            match parent {
                Some(parent) if !tree.nodes.contains_key(&parent) => {
                    return Err(DashError::DestroyedComponent { id: parent });
                }
                None => {
                    if let Some(root) = tree.root {
                        return Err(DashError::RootExists { id: root });
                    }
                }
                _ => {}
            }
            let id = ComponentId::new(tree.next_id);
            tree.next_id += 1;
            let root = match parent {
                Some(_) => tree
                    .root
                    .and_then(|r| tree.nodes.get(&r))
                    .map(|node| Rc::downgrade(&node.container)),
                None => None,
            };
            (id, root)
        };

        let container = Container::new(id, Rc::downgrade(self), self.errors.clone(), root);

        let mut tree = self.tree.borrow_mut();
        tree.nodes.insert(
            id,
            Node {
                container: Rc::clone(&container),
                parent,
                children: Vec::new(),
                instance: None,
            },
        );
        match parent {
            Some(parent) => {
                if let Some(node) = tree.nodes.get_mut(&parent) {
                    node.children.push(id);
                }
            }
            None => tree.root = Some(id),
        }
        debug!(component = %id, parent = ?parent, "AppCore::create_component: linked");
        Ok(container)
    }

    /// Create a component whose instance is built by `factory` from its dash
    pub(crate) fn build<C: Any>(
        self: &Rc<Self>,
        parent: Option<ComponentId>,
        factory: impl FnOnce(Dash) -> C,
    ) -> Result<Rc<C>> {
        let container = self.create_component(parent)?;
        let instance = Rc::new(factory(container.dash()));
        container.set_instance(instance.clone())?;
        Ok(instance)
    }

    /// Adopt an existing object as a new component
    pub(crate) fn adopt(self: &Rc<Self>, parent: Option<ComponentId>, object: Instance) -> Result<Dash> {
        let container = self.create_component(parent)?;
        container.set_instance(object)?;
        Ok(container.dash())
    }

    /// Point the instance index of `id` at `instance`, replacing any previous entry
    pub(crate) fn index_instance(&self, id: ComponentId, instance: ComponentKey) {
        let mut tree = self.tree.borrow_mut();
        let Some(previous) = tree.nodes.get_mut(&id).map(|node| node.instance.replace(instance)) else {
            return;
        };
        if let Some(previous) = previous {
            tree.by_instance.remove(&previous);
        }
        tree.by_instance.insert(instance, id);
    }

    /// Unlink a component: destroy its descendants, then detach it from its parent
    pub(crate) fn remove_component(&self, id: ComponentId) {
        for child in self.children_of(id) {
            child.destroy();
        }

        let parent = {
            let mut tree = self.tree.borrow_mut();
            let Some(node) = tree.nodes.remove(&id) else {
                return;
            };
            if let Some(key) = node.instance {
                tree.by_instance.remove(&key);
            }
            if tree.root == Some(id) {
                tree.root = None;
            }
            node.parent.and_then(|p| tree.nodes.get_mut(&p)).map(|parent| {
                parent.children.retain(|c| *c != id);
                Rc::clone(&parent.container)
            })
        };

        if let Some(parent) = parent {
            parent.forget_child(id);
        }
        debug!(component = %id, "AppCore::remove_component: unlinked");
    }

    pub(crate) fn container(&self, id: ComponentId) -> Option<Rc<Container>> {
        self.tree.borrow().nodes.get(&id).map(|node| Rc::clone(&node.container))
    }

    /// Resolve an id or an instance to its live container
    pub(crate) fn resolve(&self, key: ComponentKey) -> Option<Rc<Container>> {
        let tree = self.tree.borrow();
        let id = match key {
            ComponentKey::Id(id) => id,
            ComponentKey::Instance(_) => *tree.by_instance.get(&key)?,
        };
        tree.nodes.get(&id).map(|node| Rc::clone(&node.container))
    }

    pub(crate) fn is_component(&self, key: ComponentKey) -> bool {
        self.resolve(key).is_some()
    }

    pub(crate) fn parent_of(&self, id: ComponentId) -> Option<Rc<Container>> {
        let tree = self.tree.borrow();
        let parent = tree.nodes.get(&id)?.parent?;
        tree.nodes.get(&parent).map(|node| Rc::clone(&node.container))
    }

    /// Direct children in creation order
    pub(crate) fn children_of(&self, id: ComponentId) -> Vec<Rc<Container>> {
        let tree = self.tree.borrow();
        let Some(node) = tree.nodes.get(&id) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|c| tree.nodes.get(c))
            .map(|child| Rc::clone(&child.container))
            .collect()
    }

    pub(crate) fn component_count(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    /// Destroy the whole tree, root first
    pub(crate) fn shutdown(&self) {
        if let Some(root) = self.root() {
            info!(root = %root.id(), components = self.component_count(), "AppCore::shutdown: destroying tree");
            root.destroy();
        }
    }
}
