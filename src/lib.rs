//! # rtms
//!
//! Session coordinator for a single-threaded native real-time media engine.
//!
//! A [`Client`] owns one engine instance and keeps every call into it on a
//! single owner thread, whichever thread the application calls from:
//!
//! - In [`PollMode::External`] the thread that created the client owns the
//!   engine and must call [`Client::pump`] regularly.
//! - In [`PollMode::Background`] [`Client::new`] starts a polling thread that
//!   takes ownership; joins and leaves from other threads are queued for it.
//!
//! Webhook notifications are received by an embedded HTTP server
//! ([`Client::on_webhook_event`]); its handler runs on the server's thread,
//! so joining from it is queued like any other off-thread join.
//!
//! ```rust,ignore
//! let client = Client::new(Config::new(), my_engine)?;
//! client.on_audio_data(|frame| println!("{} bytes", frame.data.len()));
//! let joiner = client.clone();
//! client.on_webhook_event(WebhookHandler::simple(move |payload| {
//!     if payload["event"] == "meeting.rtms_started" {
//!         joiner.join(JoinRequest::from_webhook_payload(payload)?)?;
//!     }
//!     Ok(())
//! }))?;
//! loop {
//!     client.pump()?;
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! ```

mod error;

pub use engine::{
    AudioParams, DeskshareParams, JoinRequest, JoinTimeout, MediaType, NativeEngine, NativeJoin,
    Receipt, SdkStatus, SessionState, Submission, VideoParams,
};
pub use error::{Error, ErrorKind};
pub use events::{
    Event, EventHandler, EventKind, HandlerResult, IntoHandlerResult, MediaFrame, ParticipantInfo,
    SessionInfo, SessionOp, UserOp,
};
pub use service::{Config, Logger, PollMode};
pub use webhook::{StartOutcome, WebhookHandler, WebhookRequest, WebhookResponse};

use engine::{
    EnginePump, JoinSigner, OwnerThread, PollingScheduler, SessionAdapter, ThreadAffinityQueue,
};
use events::CallbackRegistry;
use log::*;
use meeting_auth::Credential;
use secrecy::SecretString;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use webhook::{WebhookConfig, WebhookIngestServer};

/// How long an off-thread leave waits for the polling thread to run it.
const LEAVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to one engine session. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

// Field order is drop order: the webhook server stops before the poller.
struct Inner {
    config: Config,
    webhook: WebhookIngestServer,
    scheduler: PollingScheduler,
    queue: Arc<ThreadAffinityQueue>,
    adapter: Arc<SessionAdapter>,
}

impl Client {
    /// Create a client around `engine` and initialize it on the calling
    /// thread, which becomes the engine's owner. In background mode ownership
    /// then passes to the polling thread started here.
    ///
    /// Also installs the process-wide logger described by `config`, unless one
    /// is already installed.
    pub fn new(config: Config, engine: impl NativeEngine + 'static) -> Result<Client, Error> {
        Logger::init_logger(&config);
        debug!("Creating client with {config:?}");

        let owner = Arc::new(OwnerThread::current());
        let signer = JoinSigner::new(config.credential_defaults(), config.signature_format);
        let adapter = Arc::new(SessionAdapter::new(
            Arc::clone(&owner),
            Box::new(engine),
            Arc::new(CallbackRegistry::new()),
            signer,
        ));

        let ca_path = service::ca::find_ca_certificate(config.ca_path());
        adapter.initialize_once(ca_path.as_deref())?;

        let queue = Arc::new(ThreadAffinityQueue::new(Arc::clone(&owner)));
        let pump = Arc::new(EnginePump::new(Arc::clone(&adapter), Arc::clone(&queue)));
        let scheduler = PollingScheduler::new(owner, pump);
        if config.poll_mode == PollMode::Background {
            // Must start while this thread still owns the engine.
            scheduler.start(config.poll_interval())?;
        }
        let webhook = WebhookIngestServer::new(WebhookConfig::from(&config));

        info!("Client ready ({} polling)", config.poll_mode);
        Ok(Client {
            inner: Arc::new(Inner {
                config,
                webhook,
                scheduler,
                queue,
                adapter,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        self.inner.adapter.state()
    }

    /// Whether a background polling thread is currently running.
    pub fn is_polling(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    /// Join a stream from any thread.
    ///
    /// On the owner thread the join runs now and the result says whether it
    /// succeeded. From any other thread the join is queued and `true` only
    /// means it was accepted; use [`Client::submit_join`] to wait for the outcome.
    /// Invalid parameters and missing credentials are reported immediately
    /// either way.
    pub fn join(&self, request: JoinRequest) -> Result<bool, Error> {
        Ok(self.submit_join(request)?.accepted())
    }

    /// Like [`Client::join`], returning a receipt for deferred joins.
    pub fn submit_join(&self, request: JoinRequest) -> Result<Submission, Error> {
        let inner = &self.inner;
        let state = inner.adapter.state();
        if state == SessionState::Released {
            return Err(engine::Error::new(engine::ErrorKind::InvalidState(state)).into());
        }
        if inner.config.poll_mode == PollMode::Background {
            let interval = request
                .poll_interval()
                .unwrap_or_else(|| inner.config.poll_interval());
            self.ensure_polling(interval)?;
            if request.poll_interval().is_some() {
                inner.scheduler.set_interval(interval);
            }
        }
        Ok(inner.queue.submit(&request, inner.adapter.as_ref())?)
    }

    /// Restart a background poller that is not running. Only the owner can;
    /// from any other thread the work stays queued.
    fn ensure_polling(&self, interval: Duration) -> Result<(), Error> {
        let scheduler = &self.inner.scheduler;
        if !scheduler.is_running() && self.inner.adapter.owner().is_current() {
            scheduler.start(interval)?;
        }
        Ok(())
    }

    /// Run queued work and poll the engine once. Owner thread only.
    pub fn pump(&self) -> Result<(), Error> {
        Ok(self.inner.scheduler.pump()?)
    }

    /// Leave the session and release the engine. Safe to call more than once.
    ///
    /// With a background poller running, a leave from another thread is run
    /// by the poller and the poller is then stopped, so the engine is
    /// released on the thread that joined.
    pub fn leave(&self) -> Result<bool, Error> {
        let inner = &self.inner;
        if inner.scheduler.is_running() && !inner.adapter.owner().is_current() {
            match inner.queue.submit_leave(inner.adapter.as_ref()) {
                Submission::Completed(left) => {
                    self.stop_polling()?;
                    return Ok(left);
                }
                Submission::Deferred(receipt) => match receipt.wait_timeout(LEAVE_TIMEOUT) {
                    Some(left) => {
                        self.stop_polling()?;
                        return Ok(left);
                    }
                    None => warn!("Polling thread did not run the leave in time; stopping it"),
                },
            }
        }

        self.stop_polling()?;
        Ok(inner.adapter.leave()?)
    }

    fn stop_polling(&self) -> Result<(), Error> {
        if self.inner.scheduler.stop() {
            Ok(())
        } else {
            Err(Error::engine(
                engine::ErrorKind::Scheduler,
                "polling thread did not stop in time",
            ))
        }
    }

    /// Meeting UUID of the joined session. Owner thread only.
    pub fn uuid(&self) -> Result<String, Error> {
        Ok(self.inner.adapter.uuid()?)
    }

    /// Stream id of the joined session. Owner thread only.
    pub fn stream_id(&self) -> Result<String, Error> {
        Ok(self.inner.adapter.stream_id()?)
    }

    /// Register `handler` for `kind`, replacing any earlier one.
    pub fn on(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Arc<dyn EventHandler> {
        self.inner.adapter.registry().register(kind, handler)
    }

    pub fn on_join_confirm<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(i32) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            EventKind::JoinConfirm,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event {
                    Event::JoinConfirm { reason } => handler(*reason).into_handler_result(),
                    _ => Ok(()),
                }
            }),
        )
    }

    pub fn on_session_update<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(SessionOp, &SessionInfo) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            EventKind::SessionUpdate,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event {
                    Event::SessionUpdate { op, session } => {
                        handler(*op, session).into_handler_result()
                    }
                    _ => Ok(()),
                }
            }),
        )
    }

    pub fn on_user_update<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(UserOp, &ParticipantInfo) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            EventKind::UserUpdate,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event {
                    Event::UserUpdate { op, participant } => {
                        handler(*op, participant).into_handler_result()
                    }
                    _ => Ok(()),
                }
            }),
        )
    }

    pub fn on_audio_data<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&MediaFrame) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on_frame(EventKind::AudioData, handler)
    }

    /// The handler also gets the video session id.
    pub fn on_video_data<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&MediaFrame, &str) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            EventKind::VideoData,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event {
                    Event::VideoData {
                        frame,
                        rtms_session_id,
                    } => handler(frame, rtms_session_id).into_handler_result(),
                    _ => Ok(()),
                }
            }),
        )
    }

    pub fn on_deskshare_data<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&MediaFrame) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on_frame(EventKind::DeskshareData, handler)
    }

    pub fn on_transcript_data<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&MediaFrame) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on_frame(EventKind::TranscriptData, handler)
    }

    fn on_frame<F, R>(&self, kind: EventKind, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&MediaFrame) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            kind,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event.frame() {
                    Some(frame) => handler(frame).into_handler_result(),
                    None => Ok(()),
                }
            }),
        )
    }

    pub fn on_leave<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(i32) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            EventKind::Leave,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event {
                    Event::Leave { reason } => handler(*reason).into_handler_result(),
                    _ => Ok(()),
                }
            }),
        )
    }

    /// Webhook payloads re-delivered on the owner thread. Only payloads that
    /// arrive while such a handler is registered are forwarded.
    pub fn on_webhook_received<F, R>(&self, handler: F) -> Arc<dyn EventHandler>
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(
            EventKind::WebhookReceived,
            Arc::new(move |event: &Event| -> HandlerResult {
                match event {
                    Event::WebhookReceived(payload) => handler(payload).into_handler_result(),
                    _ => Ok(()),
                }
            }),
        )
    }

    /// Start the webhook server with `handler`, or swap the handler if the
    /// server is already running.
    ///
    /// `handler` runs on the server's thread. Once it returns `Ok`, the payload
    /// is also queued for the owner thread if a webhook-received handler is
    /// registered. In background mode the polling thread picks that work up
    /// without a join.
    pub fn on_webhook_event(&self, handler: WebhookHandler) -> Result<StartOutcome, Error> {
        let queue = Arc::clone(&self.inner.queue);
        let registry = Arc::clone(self.inner.adapter.registry());
        let forward = move |payload: &Value| {
            if registry.is_registered(EventKind::WebhookReceived) {
                queue.post(Event::WebhookReceived(payload.clone()));
            }
        };
        let wrapped = match handler {
            WebhookHandler::Simple(handler) => WebhookHandler::simple(move |payload| {
                handler(payload)?;
                forward(payload);
                Ok(())
            }),
            WebhookHandler::FullControl(handler) => {
                WebhookHandler::full_control(move |payload, request, response| {
                    handler(payload, request, response)?;
                    forward(payload);
                    Ok(())
                })
            }
        };

        let outcome = self.inner.webhook.start(wrapped)?;
        if self.inner.config.poll_mode == PollMode::Background
            && self.inner.adapter.state() != SessionState::Released
        {
            self.ensure_polling(self.inner.config.poll_interval())?;
        }
        Ok(outcome)
    }

    /// Stop the webhook server. Returns `false` if it did not shut down in time.
    pub fn stop_webhook(&self) -> bool {
        self.inner.webhook.stop()
    }

    pub fn webhook_addr(&self) -> Option<SocketAddr> {
        self.inner.webhook.local_addr()
    }

    /// Replace the set of subscribed media types. Before joining, from any thread.
    pub fn set_media_types(&self, media_types: MediaType) -> Result<(), Error> {
        Ok(self.inner.adapter.set_media_types(media_types)?)
    }

    pub fn enable_audio(&self, enabled: bool) -> Result<(), Error> {
        Ok(self.inner.adapter.enable_media(MediaType::AUDIO, enabled)?)
    }

    pub fn enable_video(&self, enabled: bool) -> Result<(), Error> {
        Ok(self.inner.adapter.enable_media(MediaType::VIDEO, enabled)?)
    }

    pub fn enable_deskshare(&self, enabled: bool) -> Result<(), Error> {
        Ok(self.inner.adapter.enable_media(MediaType::DESKSHARE, enabled)?)
    }

    pub fn enable_transcript(&self, enabled: bool) -> Result<(), Error> {
        Ok(self.inner.adapter.enable_media(MediaType::TRANSCRIPT, enabled)?)
    }

    pub fn set_audio_params(&self, params: AudioParams) -> Result<(), Error> {
        Ok(self.inner.adapter.set_audio_params(params)?)
    }

    pub fn set_video_params(&self, params: VideoParams) -> Result<(), Error> {
        Ok(self.inner.adapter.set_video_params(params)?)
    }

    pub fn set_deskshare_params(&self, params: DeskshareParams) -> Result<(), Error> {
        Ok(self.inner.adapter.set_deskshare_params(params)?)
    }

    /// Sign a meeting/stream pair the way joins are signed. Empty credentials
    /// fall back to the configured ones.
    pub fn generate_signature(
        &self,
        client_id: &str,
        client_secret: &str,
        meeting_uuid: &str,
        stream_id: &str,
    ) -> Result<String, Error> {
        let config = &self.inner.config;
        let client_secret = SecretString::new(client_secret.to_string());
        let credential = Credential::resolve(
            Some(client_id),
            Some(&client_secret),
            &config.credential_defaults(),
        )?;
        Ok(meeting_auth::sign(
            &credential,
            meeting_uuid,
            stream_id,
            config.signature_format,
        )?)
    }
}
