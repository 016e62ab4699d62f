//! # meeting-auth
//!
//! Authentication for joining a real-time media stream:
//! - Credential resolution (explicit values with configured fallbacks)
//! - HMAC-SHA256 join signatures and their verification
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_auth::{credentials::Credential, signature::{sign, SignatureFormat}};
//!
//! let secret = SecretString::new("secret".to_string());
//! let credential = Credential::resolve(Some("client"), Some(&secret), &Default::default())?;
//! let token = sign(&credential, "meeting-uuid", "stream-id", SignatureFormat::Comma)?;
//! ```

pub mod credentials;
pub mod error;
pub mod signature;

// Re-export commonly used types
pub use credentials::{Credential, CredentialDefaults};
pub use error::{Error, ErrorKind};
pub use signature::{generate_signature, sign, verify_signature, SignatureFormat};
