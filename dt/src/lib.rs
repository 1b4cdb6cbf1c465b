//! dashtree - component trees with capability dashes
//!
//! An application is organized as a tree of isolated components. Each
//! component talks to its parent, its children and arbitrary other components
//! only through its *dash*, never through direct references.
//!
//! # Core Concepts
//!
//! - **Lifetime-bound subscriptions**: every listen made through a dash is
//!   revoked when either the listening or the emitting component is destroyed
//! - **Bubbling**: events travel from the emitter up through every ancestor
//!   until a listener stops propagation or the root is reached
//! - **Groups**: a parent names subsets of its direct children and listens to
//!   or queries them by group
//! - **Delivery modes**: synchronous, or deferred as one scheduled unit
//!
//! # Modules
//!
//! - [`app`] - Application (tree authority), scheduler, error handler
//! - [`dash`] - Public and internal capability objects
//! - [`emitter`] - Per-component publish/subscribe
//! - [`event`] - Event records and delivery modes
//! - [`transmitter`] - Disposable subscription handles
//! - [`config`] - Configuration types and loading
//! - [`cli`] / [`demo`] - The `dt` demo binary

pub mod app;
pub mod callback;
pub mod cli;
pub mod config;
pub(crate) mod container;
pub mod dash;
pub mod demo;
pub mod emitter;
pub mod error;
pub mod event;
pub mod id;
pub mod transmitter;

pub use app::{Application, ErrorHandler, LocalTaskScheduler, LogErrorHandler, QueueScheduler, Scheduler};
pub use callback::{Callback, CallbackMode};
pub use config::AppConfig;
pub use container::{ChildQuery, ParentFilter};
pub use dash::{ComponentLog, Dash, PublicDash};
pub use emitter::ChildListenOptions;
pub use error::{DashError, ListenerError, Result};
pub use event::{ComponentEvent, DESTROY_EVENT, Delivery, Instance, Names};
pub use id::{AsComponent, ComponentId, ComponentKey};
pub use transmitter::Transmitter;
