//! Publish/subscribe for one component
//!
//! - [`Emitter`] dispatches the component's own events and tracks the
//!   cancelers it installed on other components, so subscriptions made on
//!   their behalf die with them.
//! - [`ChildEmitter`] dispatches events bubbling up from descendants,
//!   filtered by the origin's group and by direct vs. deep descent.

mod child;
mod local;
mod table;

pub use child::{ChildEmitter, ChildListenOptions};
pub use local::Emitter;
