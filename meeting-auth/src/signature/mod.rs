//! Join signatures.
//!
//! A signature is `hex(HMAC-SHA256(client_secret, message))` where the message
//! joins the client id, meeting UUID and stream id. The field separator is a
//! configuration choice, see [`SignatureFormat`].

mod hmac;

pub use self::hmac::{generate_signature, sign, verify_signature};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{signature_error, Error, SignatureErrorKind};

/// How the signed message is assembled from its three fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureFormat {
    /// `client_id,meeting_uuid,stream_id`
    #[default]
    Comma,
    /// `client_idmeeting_uuidstream_id`
    Concatenated,
}

impl SignatureFormat {
    /// Build the message that gets signed.
    pub fn message(&self, client_id: &str, meeting_uuid: &str, stream_id: &str) -> String {
        match self {
            SignatureFormat::Comma => format!("{client_id},{meeting_uuid},{stream_id}"),
            SignatureFormat::Concatenated => format!("{client_id}{meeting_uuid}{stream_id}"),
        }
    }
}

impl FromStr for SignatureFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "comma" => Ok(SignatureFormat::Comma),
            "concatenated" => Ok(SignatureFormat::Concatenated),
            other => Err(signature_error(
                SignatureErrorKind::UnknownFormat,
                &format!("unknown signature format: {other}"),
            )),
        }
    }
}

impl fmt::Display for SignatureFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignatureFormat::Comma => write!(f, "comma"),
            SignatureFormat::Concatenated => write!(f, "concatenated"),
        }
    }
}
