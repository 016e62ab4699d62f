//! The boundary to the native media engine.
//!
//! The engine itself is an external collaborator: a single-threaded C library
//! that must only ever be driven from one thread. [`NativeEngine`] is the seam
//! the rest of this crate talks through; bindings (or test doubles) implement it.

use crate::media::MediaConfig;
use events::Event;
use std::fmt;

/// Non-zero status codes returned by the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkStatus {
    Failure,
    Timeout,
    NotExist,
    WrongType,
    InvalidStatus,
    InvalidArgs,
    Unknown(i32),
}

impl SdkStatus {
    pub const OK: i32 = 0;

    /// Map a raw return code to `Ok(())` or the matching status.
    pub fn check(code: i32) -> Result<(), SdkStatus> {
        match code {
            Self::OK => Ok(()),
            -1 => Err(SdkStatus::Failure),
            1 => Err(SdkStatus::Timeout),
            2 => Err(SdkStatus::NotExist),
            3 => Err(SdkStatus::WrongType),
            4 => Err(SdkStatus::InvalidStatus),
            5 => Err(SdkStatus::InvalidArgs),
            other => Err(SdkStatus::Unknown(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            SdkStatus::Failure => -1,
            SdkStatus::Timeout => 1,
            SdkStatus::NotExist => 2,
            SdkStatus::WrongType => 3,
            SdkStatus::InvalidStatus => 4,
            SdkStatus::InvalidArgs => 5,
            SdkStatus::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SdkStatus::Failure => write!(f, "failure (-1)"),
            SdkStatus::Timeout => write!(f, "timeout (1)"),
            SdkStatus::NotExist => write!(f, "does not exist (2)"),
            SdkStatus::WrongType => write!(f, "wrong type (3)"),
            SdkStatus::InvalidStatus => write!(f, "invalid status (4)"),
            SdkStatus::InvalidArgs => write!(f, "invalid arguments (5)"),
            SdkStatus::Unknown(code) => write!(f, "unknown status ({code})"),
        }
    }
}

impl std::error::Error for SdkStatus {}

/// Join parameters in the form the native engine accepts them: validated,
/// signed, and with the server URLs comma-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeJoin {
    pub meeting_uuid: String,
    pub stream_id: String,
    pub signature: String,
    pub server_urls: String,
    /// Join timeout in milliseconds; `-1` lets the engine pick.
    pub timeout_ms: i32,
}

/// A single-threaded native media engine.
///
/// Implementations may assume every call arrives on the same thread. They are
/// `Send` so ownership can move to a dedicated polling thread, but nothing
/// here requires them to be `Sync`.
pub trait NativeEngine: Send {
    /// Process-wide initialization. `ca_path` may be empty to use the engine's
    /// built-in trust store.
    fn initialize(&mut self, ca_path: &str) -> Result<(), SdkStatus>;

    /// Apply media type selection and parameters ahead of joining.
    fn configure(&mut self, media: &MediaConfig) -> Result<(), SdkStatus>;

    fn join(&mut self, join: &NativeJoin) -> Result<(), SdkStatus>;

    /// Pump the engine once, returning whatever events it surfaced.
    fn poll(&mut self) -> Result<Vec<Event>, SdkStatus>;

    fn release(&mut self) -> Result<(), SdkStatus>;

    fn uuid(&self) -> Result<String, SdkStatus>;

    fn stream_id(&self) -> Result<String, SdkStatus>;
}

impl<T: NativeEngine + ?Sized> NativeEngine for Box<T> {
    fn initialize(&mut self, ca_path: &str) -> Result<(), SdkStatus> {
        (**self).initialize(ca_path)
    }

    fn configure(&mut self, media: &MediaConfig) -> Result<(), SdkStatus> {
        (**self).configure(media)
    }

    fn join(&mut self, join: &NativeJoin) -> Result<(), SdkStatus> {
        (**self).join(join)
    }

    fn poll(&mut self) -> Result<Vec<Event>, SdkStatus> {
        (**self).poll()
    }

    fn release(&mut self) -> Result<(), SdkStatus> {
        (**self).release()
    }

    fn uuid(&self) -> Result<String, SdkStatus> {
        (**self).uuid()
    }

    fn stream_id(&self) -> Result<String, SdkStatus> {
        (**self).stream_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SdkStatus::check(0), Ok(()));
        assert_eq!(SdkStatus::check(-1), Err(SdkStatus::Failure));
        assert_eq!(SdkStatus::check(5), Err(SdkStatus::InvalidArgs));
        assert_eq!(SdkStatus::check(77), Err(SdkStatus::Unknown(77)));
    }

    #[test]
    fn test_code_round_trips_through_check() {
        for status in [
            SdkStatus::Failure,
            SdkStatus::Timeout,
            SdkStatus::NotExist,
            SdkStatus::WrongType,
            SdkStatus::InvalidStatus,
            SdkStatus::InvalidArgs,
        ] {
            assert_eq!(SdkStatus::check(status.code()), Err(status));
        }
    }
}
