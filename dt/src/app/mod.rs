//! Application - the tree authority
//!
//! The application owns every container, allocates component ids, resolves
//! instances to their containers and provides two injected facilities:
//! - a [`Scheduler`] that runs deferred emissions as independent units
//! - an [`ErrorHandler`] that receives failures raised by listener bodies

mod core;
mod errors;
mod scheduler;

use std::any::Any;
use std::rc::Rc;

use tracing::{debug, info};

pub(crate) use self::core::AppCore;
pub(crate) use errors::ErrorSink;
pub use errors::{ErrorHandler, LogErrorHandler};
pub use scheduler::{LocalTaskScheduler, QueueScheduler, Scheduler, Task};

use crate::config::AppConfig;
use crate::container::Container;
use crate::dash::{Dash, PublicDash};
use crate::error::{DashError, Result};
use crate::id::AsComponent;

/// Handle to one component tree
///
/// Not `Send`: the whole tree lives on a single thread and is driven
/// cooperatively.
pub struct Application {
    core: Rc<AppCore>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl Application {
    /// Create an application with a FIFO queue scheduler and a logging error handler
    pub fn new(config: AppConfig) -> Self {
        info!(?config, "Application::new: called");
        let errors = ErrorSink::new(Rc::new(LogErrorHandler), config.catch_panics);
        Self {
            core: AppCore::new(config, Rc::new(QueueScheduler::new()), errors),
        }
    }

    /// Replace the scheduler; call before creating components
    ///
    /// The core is rebuilt, so an existing tree would be dropped. Debug builds
    /// panic if components already exist.
    pub fn with_scheduler(self, scheduler: Rc<dyn Scheduler>) -> Self {
        debug!("Application::with_scheduler: called");
        debug_assert!(
            self.core.component_count() == 0,
            "Application::with_scheduler called after components were created"
        );
        let config = self.core.config().clone();
        let errors = self.core.errors().clone();
        Self {
            core: AppCore::new(config, scheduler, errors),
        }
    }

    /// Replace the error handler; call before creating components
    ///
    /// Same restriction as [`Application::with_scheduler`].
    pub fn with_error_handler(self, handler: impl ErrorHandler + 'static) -> Self {
        debug!("Application::with_error_handler: called");
        debug_assert!(
            self.core.component_count() == 0,
            "Application::with_error_handler called after components were created"
        );
        let config = self.core.config().clone();
        let errors = ErrorSink::new(Rc::new(handler), config.catch_panics);
        Self {
            core: AppCore::new(config, self.core.scheduler(), errors),
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.core.config()
    }

    /// Create the root component from a factory receiving its dash
    pub fn create_root<C: Any>(&self, factory: impl FnOnce(Dash) -> C) -> Result<Rc<C>> {
        let root = self.core.build(None, factory)?;
        info!("Application::create_root: root created");
        Ok(root)
    }

    /// Adopt an existing object as the root component
    pub fn adopt_root<T: Any>(&self, object: Rc<T>) -> Result<Dash> {
        self.core.adopt(None, object)
    }

    /// The root component's dash, while a root exists
    pub fn root_dash(&self) -> Option<Dash> {
        self.core.root().map(|root| root.dash())
    }

    /// Run queued deferred emissions, bounded by `max-deferred-per-flush`
    pub fn run_pending(&self) -> usize {
        let ran = self
            .core
            .scheduler()
            .run_pending(self.core.config().max_deferred_per_flush);
        debug!(ran, "Application::run_pending: done");
        ran
    }

    /// Number of deferred units waiting to run
    pub fn pending(&self) -> usize {
        self.core.scheduler().pending()
    }

    pub fn is_component(&self, target: &impl AsComponent) -> bool {
        self.core.is_component(target.component_key())
    }

    pub fn public_dash_of(&self, target: &impl AsComponent) -> Result<PublicDash> {
        self.container_of(target).map(|c| c.public_dash())
    }

    pub fn component_count(&self) -> usize {
        self.core.component_count()
    }

    /// Destroy the whole tree
    pub fn shutdown(&self) {
        self.core.shutdown();
    }

    pub(crate) fn container_of(&self, target: &impl AsComponent) -> Result<Rc<Container>> {
        self.core
            .resolve(target.component_key())
            .ok_or(DashError::NotAComponent)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("components", &self.core.component_count())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use serde_json::json;
    use std::cell::RefCell;

    struct Root;
    struct Leaf;

    #[test]
    fn test_single_root() {
        let app = Application::default();
        app.create_root(|_| Root).unwrap();
        assert!(matches!(app.create_root(|_| Root), Err(DashError::RootExists { .. })));
        assert_eq!(app.component_count(), 1);
        assert!(app.root_dash().is_some());
    }

    #[test]
    fn test_is_component_and_public_dash_of() {
        let app = Application::default();
        let root = app.create_root(|_| Root).unwrap();
        let stranger = Rc::new(Leaf);

        assert!(app.is_component(&root));
        assert!(!app.is_component(&stranger));
        assert_eq!(app.public_dash_of(&stranger).unwrap_err(), DashError::NotAComponent);

        let dash = app.public_dash_of(&root).unwrap();
        assert!(dash.instance_as::<Root>().is_ok());
    }

    #[test]
    fn test_shutdown_empties_tree() {
        let app = Application::default();
        app.create_root(|dash| {
            dash.create(|_| Leaf).unwrap();
            dash.create(|_| Leaf).unwrap();
            Root
        })
        .unwrap();
        assert_eq!(app.component_count(), 3);

        app.shutdown();
        assert_eq!(app.component_count(), 0);
        assert!(app.root_dash().is_none());
    }

    #[test]
    fn test_listener_errors_reach_handler() {
        let failures = Rc::new(RefCell::new(Vec::new()));
        let sink = failures.clone();
        let app = Application::default().with_error_handler(move |err: ListenerError| {
            sink.borrow_mut().push(err.to_string());
        });

        let root = app.create_root(|_| Root).unwrap();
        let dash = app.root_dash().unwrap();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        dash.listen("ping")
            .unwrap()
            .on_event(|_| Err(eyre::eyre!("first listener broke")))
            .on_event(move |_| {
                *counter.borrow_mut() += 1;
                Ok(())
            });

        dash.emit("ping", json!(null), crate::event::Delivery::Sync).unwrap();
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(failures.borrow().len(), 1);
        assert!(failures.borrow()[0].contains("first listener broke"));
        drop(root);
    }

    #[test]
    fn test_run_pending_respects_flush_bound() {
        let config = AppConfig {
            max_deferred_per_flush: 2,
            ..Default::default()
        };
        let app = Application::new(config);
        app.create_root(|_| Root).unwrap();
        let dash = app.root_dash().unwrap();
        for _ in 0..3 {
            dash.emit("tick", json!(null), crate::event::Delivery::Deferred).unwrap();
        }

        assert_eq!(app.pending(), 3);
        assert_eq!(app.run_pending(), 2);
        assert_eq!(app.run_pending(), 1);
        assert_eq!(app.run_pending(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "with_scheduler called after components were created")]
    fn test_with_scheduler_after_root_panics() {
        let app = Application::default();
        app.create_root(|_| Root).unwrap();
        let _ = app.with_scheduler(Rc::new(QueueScheduler::new()));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "with_error_handler called after components were created")]
    fn test_with_error_handler_after_root_panics() {
        let app = Application::default();
        app.create_root(|_| Root).unwrap();
        let _ = app.with_error_handler(LogErrorHandler);
    }
}
