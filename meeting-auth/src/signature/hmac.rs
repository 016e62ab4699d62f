//! HMAC-SHA256 signing and verification.

use hmac::{Hmac, Mac};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::SignatureFormat;
use crate::credentials::{Credential, CredentialDefaults};
use crate::error::{signature_error, Error, SignatureErrorKind};

type HmacSha256 = Hmac<Sha256>;

/// Sign a meeting/stream pair with a resolved credential.
pub fn sign(
    credential: &Credential,
    meeting_uuid: &str,
    stream_id: &str,
    format: SignatureFormat,
) -> Result<String, Error> {
    debug!(
        "Generating signature for client: {}, uuid: {}, streamId: {}",
        credential.masked_client_id(),
        meeting_uuid,
        stream_id
    );

    let mut mac = new_mac(credential.client_secret())?;
    mac.update(
        format
            .message(credential.client_id(), meeting_uuid, stream_id)
            .as_bytes(),
    );
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign from raw strings. Empty values fail with a missing credential error.
pub fn generate_signature(
    client_id: &str,
    client_secret: &str,
    meeting_uuid: &str,
    stream_id: &str,
    format: SignatureFormat,
) -> Result<String, Error> {
    let secret = SecretString::new(client_secret.to_string());
    let credential = Credential::resolve(
        Some(client_id),
        Some(&secret),
        &CredentialDefaults::default(),
    )?;
    sign(&credential, meeting_uuid, stream_id, format)
}

/// Check a hex signature against the one this credential would produce.
///
/// Returns `Ok(false)` on mismatch and an error when `signature` is not hex.
pub fn verify_signature(
    credential: &Credential,
    meeting_uuid: &str,
    stream_id: &str,
    format: SignatureFormat,
    signature: &str,
) -> Result<bool, Error> {
    let expected = hex::decode(signature).map_err(|_| {
        signature_error(SignatureErrorKind::InvalidEncoding, "Invalid signature format")
    })?;

    let mut mac = new_mac(credential.client_secret())?;
    mac.update(
        format
            .message(credential.client_id(), meeting_uuid, stream_id)
            .as_bytes(),
    );

    Ok(mac.verify_slice(&expected).is_ok())
}

fn new_mac(secret: &SecretString) -> Result<HmacSha256, Error> {
    HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| signature_error(SignatureErrorKind::InvalidKey, "Invalid HMAC key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(id: &str, secret: &str) -> Credential {
        Credential::new(id, SecretString::new(secret.to_string())).unwrap()
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"client,uuid,stream");
        let expected = hex::encode(mac.finalize().into_bytes());

        let signature = sign(
            &credential("client", "secret"),
            "uuid",
            "stream",
            SignatureFormat::Comma,
        )
        .unwrap();

        assert_eq!(signature, expected);
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let first = generate_signature("client", "secret", "uuid", "stream", SignatureFormat::Comma)
            .unwrap();
        let second = generate_signature("client", "secret", "uuid", "stream", SignatureFormat::Comma)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_changing_any_input_changes_signature() {
        let base = generate_signature("client", "secret", "uuid", "stream", SignatureFormat::Comma)
            .unwrap();
        let variants = [
            generate_signature("client2", "secret", "uuid", "stream", SignatureFormat::Comma),
            generate_signature("client", "secret2", "uuid", "stream", SignatureFormat::Comma),
            generate_signature("client", "secret", "uuid2", "stream", SignatureFormat::Comma),
            generate_signature("client", "secret", "uuid", "stream2", SignatureFormat::Comma),
            generate_signature("client", "secret", "uuid", "stream", SignatureFormat::Concatenated),
        ];
        for variant in variants {
            assert_ne!(variant.unwrap(), base);
        }
    }

    #[test]
    fn test_empty_client_id_or_secret_is_rejected() {
        assert!(generate_signature("", "secret", "uuid", "stream", SignatureFormat::Comma)
            .unwrap_err()
            .is_missing_credential());
        assert!(generate_signature("client", "", "uuid", "stream", SignatureFormat::Comma)
            .unwrap_err()
            .is_missing_credential());
    }

    #[test]
    fn test_verify_signature() {
        let credential = credential("client", "secret");
        let signature = sign(&credential, "uuid", "stream", SignatureFormat::Comma).unwrap();

        assert!(verify_signature(&credential, "uuid", "stream", SignatureFormat::Comma, &signature)
            .unwrap());
        assert!(!verify_signature(&credential, "other", "stream", SignatureFormat::Comma, &signature)
            .unwrap());
        assert!(
            verify_signature(&credential, "uuid", "stream", SignatureFormat::Comma, "not-hex")
                .is_err()
        );
    }
}
