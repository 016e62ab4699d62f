//! CA certificate bundle discovery for engine initialization.

use log::*;
use std::path::{Path, PathBuf};

/// Well-known CA bundle locations on Linux and macOS, in probe order.
pub const SYSTEM_CA_LOCATIONS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
    "/opt/homebrew/etc/openssl/cert.pem",
];

/// Returns the explicit path when it exists, otherwise the first system bundle found.
pub fn find_ca_certificate(explicit: Option<&Path>) -> Option<PathBuf> {
    find_ca_certificate_in(explicit, SYSTEM_CA_LOCATIONS.iter().map(Path::new))
}

/// Same as [`find_ca_certificate`] with a caller-supplied candidate list.
pub fn find_ca_certificate_in<'a, I>(explicit: Option<&Path>, candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    if let Some(path) = explicit {
        if path.is_file() {
            debug!("Using specified CA certificate: {}", path.display());
            return Some(path.to_path_buf());
        }
        warn!(
            "Specified CA certificate does not exist: {}; probing system locations",
            path.display()
        );
    }

    for candidate in candidates {
        if candidate.is_file() {
            debug!("Found system CA certificate: {}", candidate.display());
            return Some(candidate.to_path_buf());
        }
    }

    warn!("No CA certificate found, operation may fail");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_explicit_path_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.pem");
        let system = dir.path().join("system.pem");
        File::create(&explicit).unwrap();
        File::create(&system).unwrap();

        let found = find_ca_certificate_in(Some(explicit.as_path()), [system.as_path()]);
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn test_missing_explicit_path_falls_back_to_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pem");
        let absent_candidate = dir.path().join("absent.pem");
        let present_candidate = dir.path().join("present.pem");
        File::create(&present_candidate).unwrap();

        let found = find_ca_certificate_in(
            Some(missing.as_path()),
            [absent_candidate.as_path(), present_candidate.as_path()],
        );
        assert_eq!(found, Some(present_candidate));
    }

    #[test]
    fn test_nothing_found_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.pem");
        assert_eq!(find_ca_certificate_in(None, [absent.as_path()]), None);
    }
}
