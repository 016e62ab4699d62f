//! Session lifecycle around a single-threaded native media engine.
//!
//! # Architecture
//!
//! - **NativeEngine**: Trait over the native library; implemented by bindings or test doubles
//! - **SessionAdapter**: Initialize, join, poll and release, with a session state machine
//! - **ThreadAffinityQueue**: Runs requests from other threads on the engine's owner thread
//! - **PollingScheduler**: Application-driven pumping or a dedicated background polling thread
//!
//! Every engine call happens on one thread, the owner. Calls from anywhere else
//! either fail with a wrong-thread error or are queued until the owner drains.

pub mod adapter;
pub mod error;
pub mod media;
pub mod native;
pub mod owner;
pub mod queue;
pub mod request;
pub mod scheduler;
pub mod session;

pub use adapter::SessionAdapter;
pub use error::{Error, ErrorKind, JoinField};
pub use media::{
    AudioChannel, AudioCodec, AudioDataOption, AudioParams, ContentType, DeskshareParams,
    MediaConfig, MediaType, SampleRate, VideoCodec, VideoDataOption, VideoParams, VideoResolution,
};
pub use native::{NativeEngine, NativeJoin, SdkStatus};
pub use owner::OwnerThread;
pub use queue::{CommandSink, Receipt, Submission, ThreadAffinityQueue};
pub use request::{JoinRequest, JoinSigner, JoinTimeout};
pub use scheduler::{EnginePump, PollingScheduler, Tick, DEFAULT_POLL_INTERVAL};
pub use session::SessionState;
