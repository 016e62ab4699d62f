//! Engine event types and the callback registry that dispatches them.
//!
//! # Architecture
//!
//! - **Event**: Enum of everything the engine (or the webhook bridge) can report,
//!   each variant carrying its typed payload
//! - **EventHandler**: Trait for application callbacks, implemented for closures
//! - **CallbackRegistry**: At most one handler per [`EventKind`]
//!
//! Handlers are fired from the engine's owner thread only, so two handlers never
//! run at the same time. Registration may happen from any thread.

pub mod event;
pub mod registry;

pub use event::{
    Event, EventKind, MediaFrame, Metadata, ParticipantInfo, SessionInfo, SessionOp,
    SessionStatus, UserOp,
};
pub use registry::{
    panic_message, CallbackRegistry, Dispatch, EventHandler, HandlerError, HandlerResult,
    IntoHandlerResult,
};
