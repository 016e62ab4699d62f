//! Client credentials used to sign join requests.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{credential_error, CredentialErrorKind, Error};

/// Number of leading client id characters kept when the id is logged.
const VISIBLE_ID_CHARS: usize = 4;

/// Fallback values, normally read from the environment configuration.
#[derive(Clone, Default)]
pub struct CredentialDefaults {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

impl CredentialDefaults {
    pub fn new(client_id: Option<String>, client_secret: Option<SecretString>) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }
}

impl fmt::Debug for CredentialDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDefaults")
            .field("client_id", &self.client_id.as_deref().map(mask))
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A client id and secret pair. The secret never appears in `Debug` output and
/// the id is masked to its first few characters.
#[derive(Clone)]
pub struct Credential {
    client_id: String,
    client_secret: SecretString,
}

impl Credential {
    /// Build a credential from explicit values, rejecting empty fields.
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Result<Self, Error> {
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(credential_error(CredentialErrorKind::MissingClientId));
        }
        if client_secret.expose_secret().is_empty() {
            return Err(credential_error(CredentialErrorKind::MissingClientSecret));
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Resolve a credential field by field: an explicit, non-empty value wins,
    /// otherwise the configured default is used.
    pub fn resolve(
        client_id: Option<&str>,
        client_secret: Option<&SecretString>,
        defaults: &CredentialDefaults,
    ) -> Result<Self, Error> {
        let client_id = client_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| defaults.client_id.clone().filter(|id| !id.is_empty()))
            .ok_or_else(|| credential_error(CredentialErrorKind::MissingClientId))?;

        let client_secret = client_secret
            .filter(|secret| !secret.expose_secret().is_empty())
            .or_else(|| {
                defaults
                    .client_secret
                    .as_ref()
                    .filter(|secret| !secret.expose_secret().is_empty())
            })
            .map(|secret| SecretString::new(secret.expose_secret().clone()))
            .ok_or_else(|| credential_error(CredentialErrorKind::MissingClientSecret))?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    /// The client id in a form that is safe to log.
    pub fn masked_client_id(&self) -> String {
        mask(&self.client_id)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.masked_client_id())
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

fn mask(value: &str) -> String {
    let visible: String = value.chars().take(VISIBLE_ID_CHARS).collect();
    format!("{visible}***")
}
