//! Error types for the `meeting-auth` crate.
//!
//! A root Error struct holds an error kind tree and an optional source for chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for meeting-auth crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in meeting-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Credential(CredentialErrorKind),
    Signature(SignatureErrorKind),
}

/// Errors from resolving client credentials.
#[derive(Debug, PartialEq)]
pub enum CredentialErrorKind {
    MissingClientId,
    MissingClientSecret,
}

/// Errors from producing or checking a signature.
#[derive(Debug, PartialEq)]
pub enum SignatureErrorKind {
    InvalidKey,
    InvalidEncoding,
    UnknownFormat,
}

impl Error {
    /// True when the error is a missing client id or secret.
    pub fn is_missing_credential(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Credential(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Credential(CredentialErrorKind::MissingClientId) => {
                write!(f, "Missing credential: client id cannot be empty")
            }
            ErrorKind::Credential(CredentialErrorKind::MissingClientSecret) => {
                write!(f, "Missing credential: client secret cannot be empty")
            }
            ErrorKind::Signature(kind) => match &self.source {
                Some(source) => write!(f, "Signature error: {:?} ({})", kind, source),
                None => write!(f, "Signature error: {:?}", kind),
            },
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

/// Helper function to create credential errors.
pub fn credential_error(kind: CredentialErrorKind) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Credential(kind),
    }
}

/// Helper function to create signature errors.
pub fn signature_error(kind: SignatureErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Signature(kind),
    }
}
