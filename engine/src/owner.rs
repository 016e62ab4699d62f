use crate::error::Error;
use log::*;
use std::sync::{PoisonError, RwLock};
use std::thread::{self, ThreadId};

/// Records which thread is allowed to drive the native engine.
///
/// Ownership starts with the thread that created the engine and moves only
/// when a background poller is started or stopped.
#[derive(Debug)]
pub struct OwnerThread {
    id: RwLock<ThreadId>,
}

impl OwnerThread {
    /// Owned by the calling thread.
    pub fn current() -> Self {
        OwnerThread {
            id: RwLock::new(thread::current().id()),
        }
    }

    pub fn id(&self) -> ThreadId {
        *self.id.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_current(&self) -> bool {
        self.id() == thread::current().id()
    }

    /// Fail with a wrong-thread error naming `operation` unless called on the owner.
    pub fn ensure(&self, operation: &'static str) -> Result<(), Error> {
        if self.is_current() {
            Ok(())
        } else {
            warn!(
                "`{operation}` called from {:?}, but the engine is owned by {:?}",
                thread::current().id(),
                self.id()
            );
            Err(Error::wrong_thread(operation))
        }
    }

    /// Hand ownership to `id`, returning the previous owner.
    pub fn transfer_to(&self, id: ThreadId) -> ThreadId {
        let mut owner = self.id.write().unwrap_or_else(PoisonError::into_inner);
        let previous = *owner;
        *owner = id;
        if previous != id {
            debug!("Engine ownership moved from {previous:?} to {id:?}");
        }
        previous
    }

    /// Make the calling thread the owner.
    pub fn claim(&self) -> ThreadId {
        self.transfer_to(thread::current().id())
    }
}
