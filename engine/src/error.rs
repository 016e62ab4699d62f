//! Error types for the `engine` layer.
//!
//! Engine errors follow the same tree shape as the other crates: a root `Error`
//! holding an `ErrorKind` and an optional source. Native engine failures are
//! mostly *not* errors here: the adapter logs them and reports `false`.
//! What does surface as an error is misuse (wrong thread, invalid parameters,
//! missing credentials) and initialization failure.

use crate::native::SdkStatus;
use crate::session::SessionState;
use meeting_auth::error::{Error as AuthError, ErrorKind as AuthErrorKind};
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Which join parameter failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinField {
    MeetingUuid,
    StreamId,
    ServerUrls,
}

impl fmt::Display for JoinField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JoinField::MeetingUuid => write!(f, "meeting_uuid"),
            JoinField::StreamId => write!(f, "rtms_stream_id"),
            JoinField::ServerUrls => write!(f, "server_urls"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The native engine refused to initialize, even without a CA bundle.
    EngineInit,
    /// A required join parameter is empty.
    InvalidJoinParams(JoinField),
    /// Media parameters were rejected before reaching the engine.
    InvalidMediaParams(&'static str),
    /// An engine operation was called off the owner thread. Names the operation.
    WrongThread(&'static str),
    /// The operation is not allowed in the session's current state.
    InvalidState(SessionState),
    /// Client id or secret is empty after falling back to configured defaults.
    MissingCredential,
    /// A signature could not be produced.
    Signature,
    /// A native call failed where a result value was required.
    Native(SdkStatus),
    /// The polling thread could not be started or stopped.
    Scheduler,
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Error {
            source: None,
            error_kind,
        }
    }

    pub fn with_message(error_kind: ErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind,
        }
    }

    pub fn wrong_thread(operation: &'static str) -> Self {
        Error::new(ErrorKind::WrongThread(operation))
    }

    pub fn is_wrong_thread(&self) -> bool {
        matches!(self.error_kind, ErrorKind::WrongThread(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::EngineInit => write!(f, "Failed to initialize engine")?,
            ErrorKind::InvalidJoinParams(field) => {
                write!(f, "Invalid join parameters: {field} cannot be empty")?
            }
            ErrorKind::InvalidMediaParams(reason) => write!(f, "Invalid media parameters: {reason}")?,
            ErrorKind::WrongThread(operation) => write!(
                f,
                "`{operation}` must be called on the engine's owner thread"
            )?,
            ErrorKind::InvalidState(state) => write!(f, "Operation not allowed while {state}")?,
            ErrorKind::MissingCredential => write!(f, "Missing credential")?,
            ErrorKind::Signature => write!(f, "Failed to generate signature")?,
            ErrorKind::Native(status) => write!(f, "Engine call failed: {status}")?,
            ErrorKind::Scheduler => write!(f, "Polling scheduler error")?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        let error_kind = match err.error_kind {
            AuthErrorKind::Credential(_) => ErrorKind::MissingCredential,
            AuthErrorKind::Signature(_) => ErrorKind::Signature,
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<SdkStatus> for Error {
    fn from(status: SdkStatus) -> Self {
        Error::new(ErrorKind::Native(status))
    }
}
