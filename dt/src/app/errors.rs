//! Listener error routing

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::{error, warn};

use crate::error::ListenerError;
use crate::id::ComponentId;

/// Sink for failures raised by listener bodies
///
/// Injected into the [`Application`](super::Application) at construction and
/// shared by every emitter it creates. Closures taking a [`ListenerError`]
/// implement it directly.
pub trait ErrorHandler {
    fn handle(&self, error: ListenerError);
}

impl<F: Fn(ListenerError)> ErrorHandler for F {
    fn handle(&self, error: ListenerError) {
        self(error)
    }
}

/// Default handler: logs the failure and moves on
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, err: ListenerError) {
        error!(
            component = %err.component(),
            event = err.event(),
            panic = err.is_panic(),
            "{}",
            err
        );
    }
}

/// Per-callback isolation: runs one listener body and routes its failure
#[derive(Clone)]
pub(crate) struct ErrorSink {
    handler: Rc<dyn ErrorHandler>,
    catch_panics: bool,
}

impl ErrorSink {
    pub(crate) fn new(handler: Rc<dyn ErrorHandler>, catch_panics: bool) -> Self {
        Self { handler, catch_panics }
    }

    pub(crate) fn guard(&self, component: ComponentId, event: &str, f: impl FnOnce() -> eyre::Result<()>) {
        let outcome = if self.catch_panics {
            match catch_unwind(AssertUnwindSafe(f)) {
                Ok(result) => result.map_err(|report| ListenerError::Failed {
                    component,
                    event: event.to_string(),
                    report,
                }),
                Err(payload) => Err(ListenerError::Panicked {
                    component,
                    event: event.to_string(),
                    message: panic_message(payload.as_ref()),
                }),
            }
        } else {
            f().map_err(|report| ListenerError::Failed {
                component,
                event: event.to_string(),
                report,
            })
        };

        if let Err(err) = outcome {
            warn!(%component, event, panic = err.is_panic(), "ErrorSink::guard: listener failed");
            self.handler.handle(err);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
