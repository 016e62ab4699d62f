//! Drives the native engine through one session's lifecycle.

use crate::error::{Error, ErrorKind};
use crate::media::{AudioParams, DeskshareParams, MediaConfig, MediaType, VideoParams};
use crate::native::{NativeEngine, NativeJoin};
use crate::owner::OwnerThread;
use crate::request::{JoinRequest, JoinSigner};
use crate::session::SessionState;
use events::{CallbackRegistry, Event};
use log::*;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Owns the native engine and the session state machine.
///
/// Every method that reaches the engine checks the owner thread first, so the
/// locks below are only ever taken by one thread at a time. They exist to make
/// the adapter shareable, not to arbitrate between threads. No lock is held
/// while handlers run: a handler may call back into the adapter (typically to
/// leave) without deadlocking.
pub struct SessionAdapter {
    owner: Arc<OwnerThread>,
    engine: Mutex<Box<dyn NativeEngine>>,
    state: Mutex<SessionState>,
    media: Mutex<MediaConfig>,
    registry: Arc<CallbackRegistry>,
    signer: JoinSigner,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionAdapter {
    pub fn new(
        owner: Arc<OwnerThread>,
        engine: Box<dyn NativeEngine>,
        registry: Arc<CallbackRegistry>,
        signer: JoinSigner,
    ) -> Self {
        SessionAdapter {
            owner,
            engine: Mutex::new(engine),
            state: Mutex::new(SessionState::Uninitialized),
            media: Mutex::new(MediaConfig::default()),
            registry,
            signer,
        }
    }

    pub fn owner(&self) -> &Arc<OwnerThread> {
        &self.owner
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn signer(&self) -> &JoinSigner {
        &self.signer
    }

    /// Readable from any thread.
    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn set_state(&self, next: SessionState) -> SessionState {
        let mut state = lock(&self.state);
        let previous = *state;
        *state = next;
        trace!("Session state {previous} -> {next}");
        previous
    }

    /// Initialize the engine once. A failure with a CA bundle is retried once
    /// without one before giving up.
    pub fn initialize_once(&self, ca_path: Option<&Path>) -> Result<(), Error> {
        self.owner.ensure("initialize")?;
        if self.state() != SessionState::Uninitialized {
            debug!("Engine already initialized");
            return Ok(());
        }

        let ca = ca_path.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
        let mut engine = lock(&self.engine);
        if let Err(status) = engine.initialize(&ca) {
            if ca.is_empty() {
                error!("Engine initialization failed: {status}");
                return Err(Error::with_message(ErrorKind::EngineInit, &status.to_string()));
            }
            warn!("Engine initialization with CA {ca} failed ({status}); retrying without it");
            if let Err(status) = engine.initialize("") {
                error!("Engine initialization failed: {status}");
                return Err(Error::with_message(ErrorKind::EngineInit, &status.to_string()));
            }
        }
        drop(engine);

        self.set_state(SessionState::Initialized);
        info!("Engine initialized");
        Ok(())
    }

    /// Validate, sign and join. Must run on the owner thread.
    ///
    /// Returns `Ok(false)` when the engine rejects the join; parameter and
    /// credential problems are errors.
    pub fn join_now(&self, request: &JoinRequest) -> Result<bool, Error> {
        self.owner.ensure("join")?;
        let join = self.signer.prepare(request)?;
        self.join_prepared(join)
    }

    /// Join with parameters that were already validated and signed.
    pub fn join_prepared(&self, join: NativeJoin) -> Result<bool, Error> {
        self.owner.ensure("join")?;
        let state = self.state();
        if state != SessionState::Initialized {
            warn!("Cannot join {} while {state}", join.meeting_uuid);
            return Err(Error::new(ErrorKind::InvalidState(state)));
        }

        // Media updates check the state under the same lock, so none can land
        // after this snapshot.
        let media = {
            let media = lock(&self.media);
            self.set_state(SessionState::Joining);
            media.clone()
        };
        info!("Joining session {} (stream {})", join.meeting_uuid, join.stream_id);

        let mut engine = lock(&self.engine);
        if let Err(status) = engine.configure(&media) {
            error!("Failed to configure media for {}: {status}", join.meeting_uuid);
            drop(engine);
            self.set_state(SessionState::Initialized);
            return Ok(false);
        }

        match engine.join(&join) {
            Ok(()) => {
                drop(engine);
                self.set_state(SessionState::Active);
                info!("Joined session {}", join.meeting_uuid);
                Ok(true)
            }
            Err(status) => {
                drop(engine);
                self.set_state(SessionState::Initialized);
                error!("Failed to join session {}: {status}", join.meeting_uuid);
                Ok(false)
            }
        }
    }

    /// Pump the engine once and dispatch what it surfaced, in order.
    ///
    /// A leave event releases the engine after its handler has run, unless the
    /// handler already left. Returns how many events were dispatched; polling
    /// outside of a joining or active session is a no-op.
    pub fn poll_once(&self) -> Result<usize, Error> {
        self.owner.ensure("poll")?;
        if !self.state().is_pollable() {
            return Ok(0);
        }

        let events = lock(&self.engine).poll()?;
        let count = events.len();
        for event in events {
            if let Event::Leave { reason } = &event {
                info!("Session left with reason {reason}");
                self.set_state(SessionState::Leaving);
            }
            if let Event::JoinConfirm { reason } = &event {
                if *reason != 0 {
                    warn!("Join confirmed with reason {reason}");
                }
            }
            self.registry.fire(&event);
        }

        if self.state() == SessionState::Leaving {
            self.release();
        }
        Ok(count)
    }

    /// Leave the session and release the engine. Safe to call repeatedly; the
    /// engine is released at most once.
    ///
    /// Returns `Ok(false)` when the native release reported a failure. The
    /// session is considered released either way. Leaving a released session
    /// touches nothing and is allowed from any thread.
    pub fn leave(&self) -> Result<bool, Error> {
        if self.state() == SessionState::Released {
            debug!("Session already released");
            return Ok(true);
        }
        self.owner.ensure("leave")?;
        match self.state() {
            SessionState::Released => Ok(true),
            SessionState::Uninitialized => {
                self.set_state(SessionState::Released);
                Ok(true)
            }
            _ => {
                self.set_state(SessionState::Leaving);
                Ok(self.release())
            }
        }
    }

    fn release(&self) -> bool {
        info!("Releasing engine");
        let result = lock(&self.engine).release();
        self.set_state(SessionState::Released);
        match result {
            Ok(()) => true,
            Err(status) => {
                error!("Failed to release engine: {status}");
                false
            }
        }
    }

    pub fn uuid(&self) -> Result<String, Error> {
        self.owner.ensure("uuid")?;
        Ok(lock(&self.engine).uuid()?)
    }

    pub fn stream_id(&self) -> Result<String, Error> {
        self.owner.ensure("stream_id")?;
        Ok(lock(&self.engine).stream_id()?)
    }

    pub fn media_config(&self) -> MediaConfig {
        lock(&self.media).clone()
    }

    pub fn set_media_types(&self, media_types: MediaType) -> Result<(), Error> {
        self.update_media("set_media_types", |media| media.media_types = media_types)
    }

    pub fn enable_media(&self, media_type: MediaType, enabled: bool) -> Result<(), Error> {
        self.update_media("enable_media", |media| {
            if enabled {
                media.media_types.insert(media_type);
            } else {
                media.media_types.remove(media_type);
            }
        })
    }

    /// Setting parameters also subscribes to the media type they describe.
    pub fn set_audio_params(&self, params: AudioParams) -> Result<(), Error> {
        params.validate()?;
        self.update_media("set_audio_params", |media| {
            media.media_types.insert(MediaType::AUDIO);
            media.audio = Some(params);
        })
    }

    pub fn set_video_params(&self, params: VideoParams) -> Result<(), Error> {
        params.validate()?;
        self.update_media("set_video_params", |media| {
            media.media_types.insert(MediaType::VIDEO);
            media.video = Some(params);
        })
    }

    pub fn set_deskshare_params(&self, params: DeskshareParams) -> Result<(), Error> {
        params.validate()?;
        self.update_media("set_deskshare_params", |media| {
            media.media_types.insert(MediaType::DESKSHARE);
            media.deskshare = Some(params);
        })
    }

    /// Media settings are only stored until the join hands them to the engine,
    /// so they may be changed from any thread.
    fn update_media(
        &self,
        operation: &'static str,
        update: impl FnOnce(&mut MediaConfig),
    ) -> Result<(), Error> {
        let mut media = lock(&self.media);
        let state = self.state();
        if !state.accepts_media_config() {
            debug!("Rejected {operation} while {state}");
            return Err(Error::new(ErrorKind::InvalidState(state)));
        }
        update(&mut media);
        Ok(())
    }
}
