//! Settings validation.
//!
//! # Responsibilities
//! - Cross-field checks between verification flags and configured material
//! - Name resolution for the minimum version and cipher-suite lists
//!
//! Validation is a pure function over the settings value; file loading is a
//! separate step so that no side effect happens before all checks pass.

use super::lookup::{lookup_cipher, lookup_min_version};
use super::schema::TlsSettings;
use crate::error::Error;

/// Check a settings value before any certificate material is loaded.
pub(crate) fn validate(settings: &TlsSettings) -> Result<(), Error> {
    if settings.verify_outgoing && !settings.has_ca_source() {
        return Err(Error::MissingOutgoingCa);
    }
    if settings.any_verify_incoming() {
        if !settings.has_ca_source() {
            return Err(Error::MissingIncomingCa);
        }
        if !settings.has_keypair_paths() {
            return Err(Error::MissingIncomingIdentity);
        }
    }
    if settings.cert_file.is_some() != settings.key_file.is_some() {
        return Err(Error::IncompleteKeyPair);
    }
    if let Some(version) = settings.tls_min_version.as_deref() {
        lookup_min_version(version)?;
    }
    for name in &settings.cipher_suites {
        if lookup_cipher(name).is_none() {
            return Err(Error::UnsupportedCipher(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn with_ca(mut settings: TlsSettings) -> TlsSettings {
        settings.ca_file = Some(PathBuf::from("ca.pem"));
        settings
    }

    fn with_keypair(mut settings: TlsSettings) -> TlsSettings {
        settings.cert_file = Some(PathBuf::from("cert.pem"));
        settings.key_file = Some(PathBuf::from("key.pem"));
        settings
    }

    #[test]
    fn empty_settings_are_valid() {
        validate(&TlsSettings::default()).unwrap();
    }

    #[test]
    fn verify_outgoing_requires_trust_anchor() {
        let settings = TlsSettings {
            verify_outgoing: true,
            ..TlsSettings::default()
        };
        assert!(matches!(validate(&settings), Err(Error::MissingOutgoingCa)));
        validate(&with_ca(settings)).unwrap();
    }

    #[test]
    fn incoming_flags_require_ca_and_keypair() {
        for settings in [
            TlsSettings {
                verify_incoming: true,
                ..TlsSettings::default()
            },
            TlsSettings {
                verify_incoming_rpc: true,
                ..TlsSettings::default()
            },
            TlsSettings {
                verify_incoming_https: true,
                ..TlsSettings::default()
            },
        ] {
            assert!(matches!(validate(&settings), Err(Error::MissingIncomingCa)));
            let settings = with_ca(settings);
            assert!(matches!(
                validate(&settings),
                Err(Error::MissingIncomingIdentity)
            ));
            validate(&with_keypair(settings)).unwrap();
        }
    }

    #[test]
    fn one_sided_keypair_is_rejected() {
        let settings = TlsSettings {
            cert_file: Some(PathBuf::from("cert.pem")),
            ..TlsSettings::default()
        };
        assert!(matches!(validate(&settings), Err(Error::IncompleteKeyPair)));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let settings = TlsSettings {
            tls_min_version: Some("tlsBOGUS".to_string()),
            ..TlsSettings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(Error::UnsupportedTlsVersion(_))
        ));

        let settings = TlsSettings {
            cipher_suites: vec!["cipherX".to_string()],
            ..TlsSettings::default()
        };
        assert!(matches!(validate(&settings), Err(Error::UnsupportedCipher(_))));
    }
}
