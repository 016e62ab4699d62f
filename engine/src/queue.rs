//! Routes work to the engine's owner thread.
//!
//! Requests made on the owner thread run immediately. Anything else is queued
//! and executed, in submission order, the next time the owner drains the queue.

use crate::adapter::SessionAdapter;
use crate::error::Error;
use crate::native::NativeJoin;
use crate::owner::OwnerThread;
use crate::request::JoinRequest;
use events::Event;
use log::*;
use std::mem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// What the queue needs from whatever executes its commands.
pub trait CommandSink {
    /// Validate and sign. Runs on the submitting thread.
    fn prepare(&self, request: &JoinRequest) -> Result<NativeJoin, Error>;

    /// Join with prepared parameters. Runs on the owner thread.
    fn execute(&self, join: NativeJoin) -> bool;

    /// Leave the session. Runs on the owner thread.
    fn leave(&self) -> bool;

    /// Hand an event to application handlers. Runs on the owner thread.
    fn deliver(&self, event: Event);
}

impl CommandSink for SessionAdapter {
    fn prepare(&self, request: &JoinRequest) -> Result<NativeJoin, Error> {
        self.signer().prepare(request)
    }

    fn execute(&self, join: NativeJoin) -> bool {
        let meeting_uuid = join.meeting_uuid.clone();
        match self.join_prepared(join) {
            Ok(joined) => joined,
            Err(e) => {
                error!("Join for {meeting_uuid} failed: {e}");
                false
            }
        }
    }

    fn leave(&self) -> bool {
        match SessionAdapter::leave(self) {
            Ok(left) => left,
            Err(e) => {
                error!("Leave failed: {e}");
                false
            }
        }
    }

    fn deliver(&self, event: Event) {
        self.registry().fire(&event);
    }
}

enum Command {
    Join {
        join: NativeJoin,
        reply: SyncSender<bool>,
    },
    Leave {
        reply: SyncSender<bool>,
    },
    Deliver(Event),
}

/// Result of submitting a join or a leave.
#[derive(Debug)]
pub enum Submission {
    /// Submitted on the owner thread; the command already ran.
    Completed(bool),
    /// Queued for the owner thread. The receipt resolves once it has run.
    Deferred(Receipt),
}

impl Submission {
    /// Whether the request was taken: a completed command that succeeded, or
    /// any deferred one. A deferred join can still fail later; see its receipt.
    pub fn accepted(&self) -> bool {
        match self {
            Submission::Completed(joined) => *joined,
            Submission::Deferred(_) => true,
        }
    }
}

/// Resolves to the outcome of a deferred command.
#[derive(Debug)]
pub struct Receipt {
    outcome: Receiver<bool>,
}

impl Receipt {
    /// Block until the owner thread has run the command. `None` if the queue was
    /// dropped before that happened.
    pub fn wait(&self) -> Option<bool> {
        self.outcome.recv().ok()
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<bool> {
        match self.outcome.recv_timeout(timeout) {
            Ok(joined) => Some(joined),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// The outcome, if the command has already run.
    pub fn try_outcome(&self) -> Option<bool> {
        match self.outcome.try_recv() {
            Ok(joined) => Some(joined),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

pub struct ThreadAffinityQueue {
    owner: Arc<OwnerThread>,
    pending: Mutex<Vec<Command>>,
}

impl ThreadAffinityQueue {
    pub fn new(owner: Arc<OwnerThread>) -> Self {
        ThreadAffinityQueue {
            owner,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Submit a join from any thread.
    ///
    /// Parameters are validated and signed here, so configuration errors are
    /// returned to the caller immediately. The join itself runs now when called
    /// on the owner thread and is queued otherwise.
    pub fn submit(&self, request: &JoinRequest, sink: &dyn CommandSink) -> Result<Submission, Error> {
        let join = sink.prepare(request)?;
        if self.owner.is_current() {
            return Ok(Submission::Completed(sink.execute(join)));
        }

        debug!("Queueing join for {} until the owner thread drains", join.meeting_uuid);
        let (reply, outcome) = mpsc::sync_channel(1);
        self.push(Command::Join { join, reply });
        Ok(Submission::Deferred(Receipt { outcome }))
    }

    /// Leave from any thread; queued like a join when off the owner thread.
    pub fn submit_leave(&self, sink: &dyn CommandSink) -> Submission {
        if self.owner.is_current() {
            return Submission::Completed(sink.leave());
        }
        debug!("Queueing leave until the owner thread drains");
        let (reply, outcome) = mpsc::sync_channel(1);
        self.push(Command::Leave { reply });
        Submission::Deferred(Receipt { outcome })
    }

    /// Queue an event for delivery on the owner thread's next drain.
    pub fn post(&self, event: Event) {
        trace!("Queueing {} event", event.kind());
        self.push(Command::Deliver(event));
    }

    fn push(&self, command: Command) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run everything queued so far, in order. Owner thread only.
    ///
    /// The batch is swapped out before running, so commands may enqueue more
    /// work; that work runs on the next drain.
    pub fn drain(&self, sink: &dyn CommandSink) -> Result<usize, Error> {
        self.owner.ensure("drain")?;
        let batch = mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let count = batch.len();

        for command in batch {
            match command {
                Command::Join { join, reply } => {
                    let joined = sink.execute(join);
                    // The submitter may have dropped its receipt.
                    let _ = reply.try_send(joined);
                }
                Command::Leave { reply } => {
                    let _ = reply.try_send(sink.leave());
                }
                Command::Deliver(event) => sink.deliver(event),
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::{adapter_with, request, FakeState};
    use crate::session::SessionState;
    use events::{EventKind, HandlerResult};
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_owner_submission_runs_inline() {
        let (adapter, _) = adapter_with(FakeState::default());
        adapter.initialize_once(None).unwrap();
        let queue = ThreadAffinityQueue::new(Arc::clone(adapter.owner()));

        let submission = queue.submit(&request(), adapter.as_ref()).unwrap();
        assert!(matches!(submission, Submission::Completed(true)));
        assert_eq!(queue.pending(), 0);
        assert_eq!(adapter.state(), SessionState::Active);
    }

    #[test]
    fn test_foreign_submission_waits_for_drain() {
        let (adapter, state) = adapter_with(FakeState::default());
        adapter.initialize_once(None).unwrap();
        let queue = Arc::new(ThreadAffinityQueue::new(Arc::clone(adapter.owner())));

        let remote_queue = Arc::clone(&queue);
        let remote_adapter = Arc::clone(&adapter);
        let submission = thread::spawn(move || {
            remote_queue
                .submit(&request(), remote_adapter.as_ref())
                .unwrap()
        })
        .join()
        .unwrap();

        assert!(submission.accepted());
        assert_eq!(queue.pending(), 1);
        assert!(!state.lock().unwrap().calls.contains(&"join".to_string()));

        assert_eq!(queue.drain(adapter.as_ref()).unwrap(), 1);
        match submission {
            Submission::Deferred(receipt) => assert_eq!(receipt.try_outcome(), Some(true)),
            Submission::Completed(_) => panic!("expected a deferred join"),
        }
        assert_eq!(adapter.state(), SessionState::Active);
    }

    #[test]
    fn test_foreign_submission_reports_config_errors_immediately() {
        let (adapter, _) = adapter_with(FakeState::default());
        let queue = Arc::new(ThreadAffinityQueue::new(Arc::clone(adapter.owner())));

        let remote_queue = Arc::clone(&queue);
        let remote_adapter = Arc::clone(&adapter);
        let result = thread::spawn(move || {
            let bad = JoinRequest::new("", "stream", ["wss://a"]);
            remote_queue.submit(&bad, remote_adapter.as_ref()).map(|_| ())
        })
        .join()
        .unwrap();

        assert!(result.is_err());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_drain_off_owner_thread_is_rejected() {
        let (adapter, _) = adapter_with(FakeState::default());
        let queue = Arc::new(ThreadAffinityQueue::new(Arc::clone(adapter.owner())));
        queue.post(Event::WebhookReceived(json!({})));

        let remote_queue = Arc::clone(&queue);
        let remote_adapter = Arc::clone(&adapter);
        let err = thread::spawn(move || remote_queue.drain(remote_adapter.as_ref()).unwrap_err())
            .join()
            .unwrap();
        assert!(err.is_wrong_thread());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_posted_events_are_delivered_in_order_on_drain() {
        let (adapter, _) = adapter_with(FakeState::default());
        let queue = ThreadAffinityQueue::new(Arc::clone(adapter.owner()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);
        adapter.registry().register(
            EventKind::WebhookReceived,
            Arc::new(move |event: &Event| -> HandlerResult {
                if let Event::WebhookReceived(body) = event {
                    inner.lock().unwrap().push(body["n"].as_i64().unwrap_or_default());
                }
                Ok(())
            }),
        );

        for n in 0..3 {
            queue.post(Event::WebhookReceived(json!({ "n": n })));
        }
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(queue.drain(adapter.as_ref()).unwrap(), 3);
        assert_eq!(*seen.lock().unwrap(), [0, 1, 2]);
    }

    #[test]
    fn test_dropped_queue_resolves_receipt_to_none() {
        let (adapter, _) = adapter_with(FakeState::default());
        let queue = Arc::new(ThreadAffinityQueue::new(Arc::clone(adapter.owner())));

        let remote_queue = Arc::clone(&queue);
        let remote_adapter = Arc::clone(&adapter);
        let submission = thread::spawn(move || {
            remote_queue
                .submit(&request(), remote_adapter.as_ref())
                .unwrap()
        })
        .join()
        .unwrap();

        drop(queue);
        match submission {
            Submission::Deferred(receipt) => {
                assert_eq!(receipt.wait_timeout(Duration::from_millis(50)), None)
            }
            Submission::Completed(_) => panic!("expected a deferred join"),
        }
    }

    #[test]
    fn test_foreign_leave_runs_on_drain() {
        let (adapter, state) = adapter_with(FakeState::default());
        adapter.initialize_once(None).unwrap();
        adapter.join_now(&request()).unwrap();
        let queue = Arc::new(ThreadAffinityQueue::new(Arc::clone(adapter.owner())));

        let remote_queue = Arc::clone(&queue);
        let remote_adapter = Arc::clone(&adapter);
        let submission = thread::spawn(move || remote_queue.submit_leave(remote_adapter.as_ref()))
            .join()
            .unwrap();
        assert_eq!(adapter.state(), SessionState::Active);

        queue.drain(adapter.as_ref()).unwrap();
        match submission {
            Submission::Deferred(receipt) => assert_eq!(receipt.try_outcome(), Some(true)),
            Submission::Completed(_) => panic!("expected a deferred leave"),
        }
        assert_eq!(adapter.state(), SessionState::Released);
        assert!(state.lock().unwrap().calls.contains(&"release".to_string()));
    }
}
