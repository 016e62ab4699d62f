// Testing Tools Library
//
// Test doubles and tools for exercising the session coordinator.
// Currently includes:
// - ScriptedEngine: an in-memory native engine that records every call and the thread it came from
// - WebhookClient: posts notifications to a running webhook ingest server
// - webhook-test-client: scenario runner against a live server

pub mod output;
pub mod scenarios;
pub mod scripted_engine;
pub mod webhook_client;

pub use scripted_engine::{Call, EngineProbe, RecordedCall, ScriptedEngine};
pub use webhook_client::{rtms_started_payload, rtms_stopped_payload, WebhookClient, WebhookReply};
