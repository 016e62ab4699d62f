//! Webhook ingest: a small HTTP server that receives stream lifecycle
//! notifications and hands their JSON payloads to an application handler.
//!
//! - `POST` to the configured path with a JSON body: the handler runs and
//!   `200 {"status":"ok"}` is returned unless a full-control handler responds itself
//! - Anything else: `404 Not Found`
//! - Unparseable JSON: `400 Invalid JSON received`
//! - Handler error or panic: `500 Error: <message>`

pub mod error;
pub mod handler;
pub mod server;

pub use error::{Error, ErrorKind};
pub use handler::{WebhookHandler, WebhookRequest, WebhookResponse};
pub use server::{StartOutcome, WebhookConfig, WebhookIngestServer};
