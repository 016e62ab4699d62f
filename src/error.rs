//! Errors surfaced by [`Client`](crate::Client).
//!
//! Each layer keeps its own error type; this one only records which layer
//! failed and keeps that layer's error as the source.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    Engine(engine::ErrorKind),
    Webhook(webhook::ErrorKind),
}

impl Error {
    pub fn is_wrong_thread(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Engine(engine::ErrorKind::WrongThread(_))
        )
    }

    pub fn is_missing_credential(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Engine(engine::ErrorKind::MissingCredential)
        )
    }

    pub(crate) fn engine(error_kind: engine::ErrorKind, message: &str) -> Self {
        engine::Error::with_message(error_kind, message).into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{source}"),
            None => write!(f, "{:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<engine::Error> for Error {
    fn from(err: engine::Error) -> Self {
        Error {
            error_kind: ErrorKind::Engine(err.error_kind.clone()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<webhook::Error> for Error {
    fn from(err: webhook::Error) -> Self {
        Error {
            error_kind: ErrorKind::Webhook(err.error_kind),
            source: Some(Box::new(err)),
        }
    }
}

impl From<meeting_auth::Error> for Error {
    fn from(err: meeting_auth::Error) -> Self {
        engine::Error::from(err).into()
    }
}
