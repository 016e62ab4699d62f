use engine::{MediaConfig, NativeEngine, NativeJoin, SdkStatus};
use events::Event;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// One call into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initialize(String),
    Configure(MediaConfig),
    Join(NativeJoin),
    Poll,
    Release,
    Uuid,
    StreamId,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: Call,
    pub thread: ThreadId,
}

struct Script {
    recorded: Vec<RecordedCall>,
    fail_initialize: Option<SdkStatus>,
    fail_initialize_with_ca: Option<SdkStatus>,
    fail_join: Option<SdkStatus>,
    fail_release: Option<SdkStatus>,
    confirm_on_join: bool,
    polls: VecDeque<Vec<Event>>,
    joined: Option<NativeJoin>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            recorded: Vec::new(),
            fail_initialize: None,
            fail_initialize_with_ca: None,
            fail_join: None,
            fail_release: None,
            confirm_on_join: true,
            polls: VecDeque::new(),
            joined: None,
        }
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-memory [`NativeEngine`].
///
/// A successful join queues a `JoinConfirm { reason: 0 }` for the next poll,
/// as the real engine does. Everything else that polls return is scripted
/// through the [`EngineProbe`].
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
}

/// Test-side handle onto a [`ScriptedEngine`] that has been moved into a client.
#[derive(Clone)]
pub struct EngineProbe {
    script: Arc<Mutex<Script>>,
}

impl ScriptedEngine {
    pub fn new() -> (ScriptedEngine, EngineProbe) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            ScriptedEngine {
                script: Arc::clone(&script),
            },
            EngineProbe { script },
        )
    }

    fn record(&self, call: Call) -> MutexGuard<'_, Script> {
        let mut script = lock(&self.script);
        script.recorded.push(RecordedCall {
            call,
            thread: thread::current().id(),
        });
        script
    }
}

impl NativeEngine for ScriptedEngine {
    fn initialize(&mut self, ca_path: &str) -> Result<(), SdkStatus> {
        let script = self.record(Call::Initialize(ca_path.to_string()));
        if let Some(status) = script.fail_initialize {
            return Err(status);
        }
        match script.fail_initialize_with_ca {
            Some(status) if !ca_path.is_empty() => Err(status),
            _ => Ok(()),
        }
    }

    fn configure(&mut self, media: &MediaConfig) -> Result<(), SdkStatus> {
        drop(self.record(Call::Configure(media.clone())));
        Ok(())
    }

    fn join(&mut self, join: &NativeJoin) -> Result<(), SdkStatus> {
        let mut script = self.record(Call::Join(join.clone()));
        if let Some(status) = script.fail_join {
            return Err(status);
        }
        script.joined = Some(join.clone());
        if script.confirm_on_join {
            script.polls.push_back(vec![Event::JoinConfirm { reason: 0 }]);
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<Event>, SdkStatus> {
        let mut script = self.record(Call::Poll);
        Ok(script.polls.pop_front().unwrap_or_default())
    }

    fn release(&mut self) -> Result<(), SdkStatus> {
        let script = self.record(Call::Release);
        match script.fail_release {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn uuid(&self) -> Result<String, SdkStatus> {
        let script = self.record(Call::Uuid);
        script
            .joined
            .as_ref()
            .map(|join| join.meeting_uuid.clone())
            .ok_or(SdkStatus::NotExist)
    }

    fn stream_id(&self) -> Result<String, SdkStatus> {
        let script = self.record(Call::StreamId);
        script
            .joined
            .as_ref()
            .map(|join| join.stream_id.clone())
            .ok_or(SdkStatus::NotExist)
    }
}

impl EngineProbe {
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.script)
            .recorded
            .iter()
            .map(|recorded| recorded.call.clone())
            .collect()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        lock(&self.script).recorded.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        lock(&self.script)
            .recorded
            .iter()
            .filter(|recorded| predicate(&recorded.call))
            .count()
    }

    /// Every distinct thread that has called into the engine.
    pub fn threads(&self) -> HashSet<ThreadId> {
        lock(&self.script)
            .recorded
            .iter()
            .map(|recorded| recorded.thread)
            .collect()
    }

    /// The last successful join.
    pub fn joined(&self) -> Option<NativeJoin> {
        lock(&self.script).joined.clone()
    }

    /// Queue events for a future poll. Each call is one poll's worth.
    pub fn push_poll(&self, events: Vec<Event>) {
        lock(&self.script).polls.push_back(events);
    }

    pub fn fail_initialize(&self, status: SdkStatus) {
        lock(&self.script).fail_initialize = Some(status);
    }

    pub fn fail_initialize_with_ca(&self, status: SdkStatus) {
        lock(&self.script).fail_initialize_with_ca = Some(status);
    }

    pub fn fail_join(&self, status: Option<SdkStatus>) {
        lock(&self.script).fail_join = status;
    }

    pub fn fail_release(&self, status: SdkStatus) {
        lock(&self.script).fail_release = Some(status);
    }

    pub fn confirm_on_join(&self, confirm: bool) {
        lock(&self.script).confirm_on_join = confirm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join() -> NativeJoin {
        NativeJoin {
            meeting_uuid: "uuid".into(),
            stream_id: "stream".into(),
            signature: "sig".into(),
            server_urls: "wss://a".into(),
            timeout_ms: -1,
        }
    }

    #[test]
    fn test_join_queues_confirmation() {
        let (mut engine, probe) = ScriptedEngine::new();
        engine.initialize("").unwrap();
        engine.join(&join()).unwrap();

        assert_eq!(engine.poll().unwrap(), vec![Event::JoinConfirm { reason: 0 }]);
        assert!(engine.poll().unwrap().is_empty());
        assert_eq!(engine.uuid().unwrap(), "uuid");
        assert_eq!(probe.count(|call| matches!(call, Call::Poll)), 2);
        assert_eq!(probe.threads().len(), 1);
    }

    #[test]
    fn test_configure_is_recorded_and_unlocks() {
        let (mut engine, probe) = ScriptedEngine::new();
        let media = MediaConfig::default();
        engine.configure(&media).unwrap();
        engine.join(&join()).unwrap();

        assert_eq!(probe.calls(), vec![Call::Configure(media), Call::Join(join())]);
    }

    #[test]
    fn test_scripted_failures() {
        let (mut engine, probe) = ScriptedEngine::new();
        probe.fail_initialize_with_ca(SdkStatus::Failure);
        probe.fail_join(Some(SdkStatus::InvalidArgs));
        probe.fail_release(SdkStatus::InvalidStatus);

        assert_eq!(engine.initialize("/ca.pem"), Err(SdkStatus::Failure));
        assert_eq!(engine.initialize(""), Ok(()));
        assert_eq!(engine.join(&join()), Err(SdkStatus::InvalidArgs));
        assert_eq!(engine.uuid(), Err(SdkStatus::NotExist));
        assert_eq!(engine.release(), Err(SdkStatus::InvalidStatus));
        assert!(probe.joined().is_none());
    }
}
