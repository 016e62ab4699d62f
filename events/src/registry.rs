use crate::event::{Event, EventKind};
use dashmap::DashMap;
use log::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Error type handlers return; anything that converts into a boxed error works with `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// Lets typed callbacks return either `()` or a `Result`.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E: Into<HandlerError>> IntoHandlerResult for Result<(), E> {
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

/// An application callback for engine events.
///
/// Handlers run on the engine's owner thread while it is polling, so they should
/// return quickly: a blocked handler stalls the engine.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event) -> HandlerResult;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> HandlerResult + Send + Sync,
{
    fn handle(&self, event: &Event) -> HandlerResult {
        self(event)
    }
}

/// Outcome of firing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran and returned `Ok`.
    Handled,
    /// Nothing is registered for the event's kind; the event was dropped.
    Unhandled,
    /// The handler returned an error or panicked. Already logged.
    Failed,
}

/// One handler slot per event kind.
///
/// Slot writes are whole-`Arc` swaps inside the map, so a concurrent `fire`
/// observes either the old or the new handler, never a partial one.
pub struct CallbackRegistry {
    handlers: DashMap<EventKind, Arc<dyn EventHandler>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any previous one. The handler is
    /// returned so the caller can keep (or re-register) it.
    pub fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Arc<dyn EventHandler> {
        if self.handlers.insert(kind, Arc::clone(&handler)).is_some() {
            debug!("Replaced {kind} handler");
        } else {
            debug!("Registered {kind} handler");
        }
        handler
    }

    /// Remove the handler for `kind`, returning it if there was one.
    pub fn unregister(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.handlers.remove(&kind).map(|(_, handler)| handler)
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Invoke the handler registered for the event's kind.
    ///
    /// Handler errors and panics are logged and reported as [`Dispatch::Failed`];
    /// they never propagate to the caller.
    pub fn fire(&self, event: &Event) -> Dispatch {
        let kind = event.kind();

        // Clone the handler out so no map shard lock is held while it runs.
        let handler = match self.handlers.get(&kind) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                trace!("No {kind} handler registered; dropping event");
                return Dispatch::Unhandled;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
            Ok(Ok(())) => Dispatch::Handled,
            Ok(Err(e)) => {
                error!("Error in {kind} callback: {e}");
                Dispatch::Failed
            }
            Err(panic) => {
                error!("Panic in {kind} callback: {}", panic_message(panic.as_ref()));
                Dispatch::Failed
            }
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown error".to_string()
    }
}
