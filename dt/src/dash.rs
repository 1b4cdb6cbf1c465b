//! Capability objects handed to components
//!
//! - [`PublicDash`] is what other code may see of a component: navigation,
//!   child queries, subscriptions on its own events, self-destroy, logging.
//! - [`Dash`] is the component's private capability. It embeds a
//!   `PublicDash` and adds emission, grouping, child creation and the
//!   lifetime-scoped listen operations.
//!
//! Both hold the container weakly. Once the component is destroyed every
//! fallible operation returns [`DashError::DestroyedComponent`].

use std::any::Any;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::container::{ChildQuery, Container, ParentFilter};
use crate::emitter::ChildListenOptions;
use crate::error::{DashError, Result};
use crate::event::{ComponentEvent, Delivery, Instance, Names};
use crate::id::{AsComponent, ComponentId, ComponentKey};
use crate::transmitter::Transmitter;

fn downcast<T: Any>(id: ComponentId, instance: Instance) -> Result<Rc<T>> {
    instance.downcast::<T>().map_err(|_| DashError::TypeMismatch {
        id,
        expected: std::any::type_name::<T>(),
    })
}

/// Read-only capability over one component
#[derive(Clone)]
pub struct PublicDash {
    id: ComponentId,
    container: Weak<Container>,
}

impl PublicDash {
    pub(crate) fn new(id: ComponentId, container: Weak<Container>) -> Self {
        Self { id, container }
    }

    fn container(&self) -> Result<Rc<Container>> {
        let container = self
            .container
            .upgrade()
            .ok_or(DashError::DestroyedComponent { id: self.id })?;
        container.check_alive()?;
        Ok(container)
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Whether the component is still alive
    pub fn is_alive(&self) -> bool {
        self.container.upgrade().is_some_and(|c| c.is_alive())
    }

    pub fn instance(&self) -> Result<Instance> {
        self.container()?.instance()
    }

    pub fn instance_as<T: Any>(&self) -> Result<Rc<T>> {
        downcast(self.id, self.instance()?)
    }

    /// The direct parent's instance
    pub fn parent(&self) -> Result<Option<Instance>> {
        self.get_parent(None)
    }

    /// The nearest ancestor accepted by `filter`
    pub fn get_parent(&self, filter: Option<ParentFilter<'_>>) -> Result<Option<Instance>> {
        self.container()?
            .get_parent(filter)?
            .map(|parent| parent.instance())
            .transpose()
    }

    /// Every ancestor accepted by `filter`, nearest first
    pub fn get_all_parents(&self, filter: Option<ParentFilter<'_>>) -> Result<Vec<Instance>> {
        self.container()?
            .get_all_parents(filter)?
            .iter()
            .map(|parent| parent.instance())
            .collect()
    }

    /// Subscribe on this component's own events
    ///
    /// Not scoped to any other lifetime: use the dash's `listen_to` for that.
    pub fn listen(&self, names: impl Into<Names>) -> Result<Transmitter> {
        self.container()?.listen(names.into())
    }

    pub fn on_event(
        &self,
        name: impl Into<Names>,
        f: impl Fn(&ComponentEvent) -> eyre::Result<()> + 'static,
    ) -> Result<&Self> {
        self.listen(name)?.on_event(f);
        Ok(self)
    }

    pub fn on_data(
        &self,
        name: impl Into<Names>,
        f: impl Fn(&Value, &ComponentEvent) -> eyre::Result<()> + 'static,
    ) -> Result<&Self> {
        self.listen(name)?.on_data(f);
        Ok(self)
    }

    pub fn destroy(&self) -> Result<()> {
        self.container()?.destroy();
        Ok(())
    }

    pub fn children(&self, query: impl Into<ChildQuery>) -> Result<Vec<Instance>> {
        self.container()?.children(&query.into())
    }

    /// Children of concrete type `T` matching `query`; others are skipped
    pub fn children_of<T: Any>(&self, query: impl Into<ChildQuery>) -> Result<Vec<Rc<T>>> {
        Ok(self
            .children(query)?
            .into_iter()
            .filter_map(|child| child.downcast::<T>().ok())
            .collect())
    }

    pub fn get_child(&self, query: impl Into<ChildQuery>) -> Result<Instance> {
        self.container()?.get_child(&query.into())
    }

    pub fn count_children(&self, query: impl Into<ChildQuery>) -> Result<usize> {
        self.container()?.count_children(&query.into())
    }

    pub fn has_children(&self, query: impl Into<ChildQuery>) -> Result<bool> {
        self.container()?.has_children(&query.into())
    }

    pub fn is_child(&self, target: &impl AsComponent) -> Result<bool> {
        self.container()?.is_child(target.component_key())
    }

    pub fn is_component(&self, target: &impl AsComponent) -> Result<bool> {
        Ok(self.container()?.app()?.is_component(target.component_key()))
    }

    pub fn public_dash_of(&self, target: &impl AsComponent) -> Result<PublicDash> {
        Ok(self.container()?.resolve(target.component_key())?.public_dash())
    }

    /// Logging handle tagging every record with this component's id
    pub fn log(&self) -> ComponentLog {
        ComponentLog { id: self.id }
    }
}

impl AsComponent for PublicDash {
    fn component_key(&self) -> ComponentKey {
        ComponentKey::Id(self.id)
    }
}

impl std::fmt::Debug for PublicDash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicDash")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Private capability of one component
///
/// Every read-only operation of [`PublicDash`] is available through `Deref`.
#[derive(Clone)]
pub struct Dash {
    public: PublicDash,
    /// The root container; `None` for the root itself
    root: Option<Weak<Container>>,
}

impl Deref for Dash {
    type Target = PublicDash;

    fn deref(&self) -> &PublicDash {
        &self.public
    }
}

impl Dash {
    pub(crate) fn new(public: PublicDash, root: Option<Weak<Container>>) -> Self {
        Self { public, root }
    }

    pub fn public_dash(&self) -> PublicDash {
        self.public.clone()
    }

    /// The root component's instance, downcast to `T`
    ///
    /// `None` on the root's own dash.
    pub fn app<T: Any>(&self) -> Option<Result<Rc<T>>> {
        let root = self.root.as_ref()?;
        Some(match root.upgrade() {
            Some(container) => container
                .instance()
                .and_then(|instance| downcast(container.id(), instance)),
            None => Err(DashError::DestroyedComponent { id: self.id() }),
        })
    }

    /// Set or replace the backing instance
    pub fn set_instance<T: Any>(&self, instance: Rc<T>) -> Result<&Self> {
        self.container()?.set_instance(instance)?;
        Ok(self)
    }

    /// Add event names to the allow-list
    ///
    /// With `strict-events` on (the default) the allow-list becomes
    /// exhaustive: emitting any other name fails with `UnexposedEvent`.
    pub fn expose_events(&self, names: impl Into<Names>) -> Result<&Self> {
        self.container()?.expose_events(names.into())?;
        Ok(self)
    }

    /// Create a child component
    pub fn create<C: Any>(&self, factory: impl FnOnce(Dash) -> C) -> Result<Rc<C>> {
        self.container()?.create_child(factory)
    }

    /// Adopt an existing object as a child component and return its dash
    pub fn as_component<T: Any>(&self, object: Rc<T>) -> Result<Dash> {
        self.container()?.adopt_child(object)
    }

    pub fn add_to_group(&self, child: &impl AsComponent, groups: impl Into<Names>) -> Result<&Self> {
        self.container()?.add_to_group(child.component_key(), groups.into())?;
        Ok(self)
    }

    pub fn remove_from_group(&self, child: &impl AsComponent, groups: impl Into<Names>) -> Result<&Self> {
        self.container()?
            .remove_from_group(child.component_key(), groups.into())?;
        Ok(self)
    }

    pub fn is_in_group(&self, child: &impl AsComponent, groups: impl Into<Names>) -> Result<bool> {
        self.container()?.is_in_group(child.component_key(), &groups.into())
    }

    pub fn emit(&self, name: &str, data: Value, delivery: Delivery) -> Result<&Self> {
        self.container()?.emit(name, data, delivery)?;
        Ok(self)
    }

    /// Emit one event per name with the same payload
    pub fn emit_all(&self, names: impl Into<Names>, data: Value, delivery: Delivery) -> Result<&Self> {
        self.container()?.emit_all(names.into(), data, delivery)?;
        Ok(self)
    }

    /// Re-deliver an existing event on this component's own listeners
    pub fn broadcast(&self, event: &ComponentEvent, delivery: Delivery) -> Result<&Self> {
        self.container()?.broadcast(event, delivery)?;
        Ok(self)
    }

    pub fn listen_to_parent(&self, names: impl Into<Names>, filter: Option<ParentFilter<'_>>) -> Result<Transmitter> {
        self.container()?.listen_to_parent(names.into(), filter)
    }

    pub fn listen_to_all_parents(
        &self,
        names: impl Into<Names>,
        filter: Option<ParentFilter<'_>>,
    ) -> Result<Transmitter> {
        self.container()?.listen_to_all_parents(names.into(), filter)
    }

    pub fn listen_to_children(&self, names: impl Into<Names>, options: ChildListenOptions) -> Result<Transmitter> {
        self.container()?.listen_to_children(names.into(), options)
    }

    /// Listen on another component; disabled when either side is destroyed
    pub fn listen_to(&self, target: &impl AsComponent, names: impl Into<Names>) -> Result<Transmitter> {
        self.container()?.listen_to(target.component_key(), names.into())
    }

    pub fn destroy_children(&self, query: impl Into<ChildQuery>) -> Result<&Self> {
        self.container()?.destroy_children(&query.into())?;
        Ok(self)
    }
}

impl AsComponent for Dash {
    fn component_key(&self) -> ComponentKey {
        ComponentKey::Id(self.id())
    }
}

impl std::fmt::Debug for Dash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dash")
            .field("id", &self.id())
            .field("root", &self.root.is_none())
            .finish()
    }
}

/// Logging handle bound to one component
#[derive(Debug, Clone, Copy)]
pub struct ComponentLog {
    id: ComponentId,
}

impl ComponentLog {
    pub fn error(&self, message: &str) {
        error!(component = %self.id, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(component = %self.id, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(component = %self.id, "{message}");
    }

    pub fn debug(&self, message: &str) {
        debug!(component = %self.id, "{message}");
    }

    pub fn trace(&self, message: &str) {
        trace!(component = %self.id, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Application;
    use serde_json::json;

    struct App {
        dash: Dash,
        title: &'static str,
    }

    struct Widget {
        dash: Dash,
    }

    #[test]
    fn test_every_operation_fails_after_destroy() {
        let app = Application::default();
        let root = app.create_root(|dash| App { dash, title: "demo" }).unwrap();
        let widget = root.dash.create(|dash| Widget { dash }).unwrap();
        let dash = widget.dash.clone();
        dash.destroy().unwrap();

        let destroyed = |err: DashError| assert!(err.is_destroyed(), "{err}");
        destroyed(dash.instance().unwrap_err());
        destroyed(dash.parent().unwrap_err());
        destroyed(dash.get_all_parents(None).unwrap_err());
        destroyed(dash.listen("x").unwrap_err());
        destroyed(dash.on_event("x", |_| Ok(())).unwrap_err());
        destroyed(dash.on_data("x", |_, _| Ok(())).unwrap_err());
        destroyed(dash.destroy().unwrap_err());
        destroyed(dash.children(ChildQuery::all()).unwrap_err());
        destroyed(dash.count_children(ChildQuery::all()).unwrap_err());
        destroyed(dash.is_child(&root).unwrap_err());
        destroyed(dash.is_component(&root).unwrap_err());
        destroyed(dash.public_dash_of(&root).unwrap_err());
        destroyed(dash.expose_events("x").unwrap_err());
        destroyed(dash.create(|dash| Widget { dash }).err().unwrap());
        destroyed(dash.as_component(Rc::new(1_u8)).unwrap_err());
        destroyed(dash.add_to_group(&root, "g").unwrap_err());
        destroyed(dash.emit("x", json!(null), Delivery::Sync).unwrap_err());
        destroyed(dash.listen_to_parent("x", None).unwrap_err());
        destroyed(dash.listen_to_all_parents("x", None).unwrap_err());
        destroyed(dash.listen_to_children("x", ChildListenOptions::default()).unwrap_err());
        destroyed(dash.listen_to(&root, "x").unwrap_err());
        destroyed(dash.destroy_children(ChildQuery::all()).unwrap_err());
        assert!(!dash.is_alive());
    }

    #[test]
    fn test_app_accessor() {
        let app = Application::default();
        let root = app.create_root(|dash| App { dash, title: "demo" }).unwrap();
        let widget = root.dash.create(|dash| Widget { dash }).unwrap();

        assert!(root.dash.app::<App>().is_none());
        let found = widget.dash.app::<App>().unwrap().unwrap();
        assert_eq!(found.title, "demo");
        assert!(matches!(widget.dash.app::<Widget>(), Some(Err(DashError::TypeMismatch { .. }))));
    }

    #[test]
    fn test_as_component_adopts_object() {
        let app = Application::default();
        let root = app.create_root(|dash| App { dash, title: "demo" }).unwrap();
        let object = Rc::new(String::from("adopted"));

        let dash = root.dash.as_component(object.clone()).unwrap();
        assert!(app.is_component(&object));
        assert!(root.dash.is_child(&object).unwrap());
        assert_eq!(*dash.instance_as::<String>().unwrap(), "adopted");
    }

    #[test]
    fn test_strict_expose_events() {
        let app = Application::default();
        let root = app.create_root(|dash| App { dash, title: "demo" }).unwrap();
        root.dash.expose_events(["x"]).unwrap();

        assert!(root.dash.emit("x", json!(null), Delivery::Sync).is_ok());
        assert_eq!(
            root.dash.emit("y", json!(null), Delivery::Deferred).unwrap_err(),
            DashError::UnexposedEvent { event: "y".to_string() }
        );
        assert_eq!(app.pending(), 0);
    }

    #[test]
    fn test_uninitialized_instance_inside_factory() {
        let app = Application::default();
        app.create_root(|dash| {
            assert!(matches!(dash.instance(), Err(DashError::UninitializedInstance { .. })));
            App { dash, title: "demo" }
        })
        .unwrap();
    }

    #[test]
    fn test_public_dash_equivalence() {
        let app = Application::default();
        let root = app.create_root(|dash| App { dash, title: "demo" }).unwrap();
        let public = root.dash.public_dash();
        assert_eq!(public.id(), root.dash.id());
        assert_eq!(app.public_dash_of(&root).unwrap().id(), public.id());
        public.log().info("hello");
    }
}
