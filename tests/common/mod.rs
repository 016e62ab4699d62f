#![allow(dead_code)]

use rtms::{Client, Config, JoinRequest, PollMode};
use std::thread;
use std::time::{Duration, Instant};
use testing_tools::{EngineProbe, ScriptedEngine};

pub fn config(poll_mode: PollMode) -> Config {
    Config::from_args(["--log-level-filter", "warn"])
        .expect("default configuration parses")
        .with_client_id("client")
        .with_client_secret("secret")
        .with_webhook("127.0.0.1", 0, "/")
        .with_poll_mode(poll_mode)
        .with_poll_interval(Duration::from_millis(2))
}

pub fn client(poll_mode: PollMode) -> (Client, EngineProbe) {
    let (engine, probe) = ScriptedEngine::new();
    let client = Client::new(config(poll_mode), engine).expect("client initializes");
    (client, probe)
}

pub fn request() -> JoinRequest {
    JoinRequest::new("meeting-uuid", "stream-id", ["wss://a.example", "wss://b.example"])
}

/// Poll `condition` for up to two seconds.
pub fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}
