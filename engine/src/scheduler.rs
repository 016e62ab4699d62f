//! Who calls the engine's poll, and when.
//!
//! Two modes share one [`PollingScheduler`]:
//! - **External**: the application calls [`PollingScheduler::pump`] from the
//!   owner thread at its own cadence.
//! - **Background**: [`PollingScheduler::start`] spawns a dedicated OS thread
//!   that becomes the owner and ticks on a fixed interval until stopped.

use crate::adapter::SessionAdapter;
use crate::error::{Error, ErrorKind};
use crate::owner::OwnerThread;
use crate::queue::ThreadAffinityQueue;
use crate::session::SessionState;
use events::panic_message;
use log::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Sleeps are split so a stop request is noticed within a tenth of an interval,
/// and never later than one maximum slice.
const SLEEP_SLICES: u32 = 10;
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);
const ERROR_BACKOFF: Duration = Duration::from_millis(100);
const STOP_TIMEOUT: Duration = Duration::from_secs(1);
const THREAD_NAME: &str = "rtms-poller";

/// One unit of owner-thread work.
pub trait Tick: Send + Sync {
    fn tick(&self) -> Result<(), Error>;

    /// When true, a background loop exits on its own after the current tick.
    fn finished(&self) -> bool {
        false
    }
}

/// Drains the thread-affinity queue, then polls the engine.
pub struct EnginePump {
    adapter: Arc<SessionAdapter>,
    queue: Arc<ThreadAffinityQueue>,
}

impl EnginePump {
    pub fn new(adapter: Arc<SessionAdapter>, queue: Arc<ThreadAffinityQueue>) -> Self {
        EnginePump { adapter, queue }
    }
}

impl Tick for EnginePump {
    fn tick(&self) -> Result<(), Error> {
        self.queue.drain(self.adapter.as_ref())?;
        self.adapter.poll_once()?;
        Ok(())
    }

    fn finished(&self) -> bool {
        self.adapter.state() == SessionState::Released && self.queue.pending() == 0
    }
}

struct Worker {
    stop: Arc<AtomicBool>,
    interval_nanos: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    done: Receiver<()>,
    thread: JoinHandle<()>,
}

pub struct PollingScheduler {
    owner: Arc<OwnerThread>,
    tick: Arc<dyn Tick>,
    worker: Mutex<Option<Worker>>,
}

impl PollingScheduler {
    pub fn new(owner: Arc<OwnerThread>, tick: Arc<dyn Tick>) -> Self {
        PollingScheduler {
            owner,
            tick,
            worker: Mutex::new(None),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one tick. Owner thread only, so this fails while a background loop
    /// holds ownership.
    pub fn pump(&self) -> Result<(), Error> {
        self.owner.ensure("pump")?;
        self.tick.tick()
    }

    pub fn is_running(&self) -> bool {
        self.worker()
            .as_ref()
            .is_some_and(|worker| worker.alive.load(Ordering::Acquire))
    }

    /// Start background polling; the new thread becomes the engine's owner
    /// before this returns. Returns `Ok(false)` if a loop is already running.
    pub fn start(&self, interval: Duration) -> Result<bool, Error> {
        let mut slot = self.worker();
        if let Some(worker) = slot.as_ref() {
            if worker.alive.load(Ordering::Acquire) {
                debug!("Background polling already running");
                return Ok(false);
            }
        }
        if let Some(finished) = slot.take() {
            let _ = finished.thread.join();
        }
        self.owner.ensure("start polling")?;

        let interval_nanos = Arc::new(AtomicU64::new(interval_to_nanos(interval)));
        let stop = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));
        let (done_tx, done) = mpsc::channel();
        let (ready_tx, ready) = mpsc::sync_channel(1);

        let thread_owner = Arc::clone(&self.owner);
        let thread_tick = Arc::clone(&self.tick);
        let thread_stop = Arc::clone(&stop);
        let thread_alive = Arc::clone(&alive);
        let thread_interval = Arc::clone(&interval_nanos);
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                thread_owner.claim();
                let _ = ready_tx.send(());
                run_loop(thread_tick.as_ref(), &thread_stop, &thread_interval);
                thread_alive.store(false, Ordering::Release);
                let _ = done_tx.send(());
            })
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Scheduler,
            })?;

        if ready.recv().is_err() {
            return Err(Error::with_message(
                ErrorKind::Scheduler,
                "polling thread exited before taking ownership",
            ));
        }

        info!("Background polling started every {:?}", interval.max(MIN_POLL_INTERVAL));
        *slot = Some(Worker {
            stop,
            interval_nanos,
            alive,
            done,
            thread,
        });
        Ok(true)
    }

    /// Change the pause between ticks of a running loop; takes effect after
    /// the current pause. Returns `false` when no loop is running.
    pub fn set_interval(&self, interval: Duration) -> bool {
        match self.worker().as_ref() {
            Some(worker) if worker.alive.load(Ordering::Acquire) => {
                worker
                    .interval_nanos
                    .store(interval_to_nanos(interval), Ordering::Release);
                debug!("Polling interval set to {:?}", interval.max(MIN_POLL_INTERVAL));
                true
            }
            _ => false,
        }
    }

    /// Stop background polling and wait up to one second for the loop to exit.
    ///
    /// Ownership returns to the calling thread once the loop has exited.
    /// Returns `false` if it did not exit in time; the thread is then left to
    /// finish on its own and keeps ownership. Called from the polling thread
    /// itself, this only requests the stop and returns `true`.
    pub fn stop(&self) -> bool {
        let Some(worker) = self.worker().take() else {
            return true;
        };
        worker.stop.store(true, Ordering::Release);

        if worker.thread.thread().id() == thread::current().id() {
            debug!("Stop requested from the polling thread; exiting after this tick");
            return true;
        }

        match worker.done.recv_timeout(STOP_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.thread.join().is_err() {
                    warn!("Polling thread panicked while shutting down");
                }
                self.owner.claim();
                info!("Background polling stopped");
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Polling thread did not stop within {STOP_TIMEOUT:?}");
                false
            }
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn interval_to_nanos(interval: Duration) -> u64 {
    u64::try_from(interval.max(MIN_POLL_INTERVAL).as_nanos()).unwrap_or(u64::MAX)
}

fn run_loop(tick: &dyn Tick, stop: &AtomicBool, interval_nanos: &AtomicU64) {
    debug!("Polling loop started on {:?}", thread::current().id());
    while !stop.load(Ordering::Acquire) {
        let pause = match catch_unwind(AssertUnwindSafe(|| tick.tick())) {
            Ok(Ok(())) => Duration::from_nanos(interval_nanos.load(Ordering::Acquire)),
            Ok(Err(e)) => {
                error!("Polling failed: {e}");
                ERROR_BACKOFF
            }
            Err(panic) => {
                error!("Polling panicked: {}", panic_message(panic.as_ref()));
                ERROR_BACKOFF
            }
        };
        if tick.finished() {
            debug!("Session finished; polling loop exiting");
            break;
        }
        sleep_unless_stopped(stop, pause);
    }
    debug!("Polling loop exited");
}

fn sleep_unless_stopped(stop: &AtomicBool, total: Duration) {
    let slice = (total / SLEEP_SLICES).min(MAX_SLEEP_SLICE);
    // An unrepresentable deadline means sleep until stopped.
    let deadline = Instant::now().checked_add(total);
    while !stop.load(Ordering::Acquire) {
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => slice,
        };
        if remaining.is_zero() {
            return;
        }
        thread::sleep(slice.min(remaining));
    }
}
