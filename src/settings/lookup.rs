//! Name-to-identifier tables for protocol versions and cipher suites.

use rustls::crypto::ring::cipher_suite;
use rustls::{version, SupportedCipherSuite, SupportedProtocolVersion};

use crate::error::Error;

/// Minimum protocol version accepted from the settings value.
///
/// rustls refuses to negotiate below TLS 1.2, so the two historical names
/// are accepted for compatibility and clamp to the 1.2 floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

static TLS13_ONLY: [&SupportedProtocolVersion; 1] = [&version::TLS13];
static TLS12_AND_UP: [&SupportedProtocolVersion; 2] = [&version::TLS12, &version::TLS13];

impl MinVersion {
    /// Protocol versions the engine may negotiate under this floor.
    pub(crate) fn protocol_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            MinVersion::Tls13 => &TLS13_ONLY,
            _ => &TLS12_AND_UP,
        }
    }
}

/// Resolve a minimum-version name from the settings value.
pub fn lookup_min_version(name: &str) -> Result<MinVersion, Error> {
    match name {
        "tls10" => Ok(MinVersion::Tls10),
        "tls11" => Ok(MinVersion::Tls11),
        "tls12" => Ok(MinVersion::Tls12),
        "tls13" => Ok(MinVersion::Tls13),
        other => Err(Error::UnsupportedTlsVersion(other.to_string())),
    }
}

/// Resolve one canonical cipher-suite name to the engine's identifier.
pub(crate) fn lookup_cipher(name: &str) -> Option<SupportedCipherSuite> {
    Some(match name {
        "TLS_AES_128_GCM_SHA256" => cipher_suite::TLS13_AES_128_GCM_SHA256,
        "TLS_AES_256_GCM_SHA384" => cipher_suite::TLS13_AES_256_GCM_SHA384,
        "TLS_CHACHA20_POLY1305_SHA256" => cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256" => {
            cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
        }
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384" => {
            cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
        }
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305" => {
            cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
        }
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256" => {
            cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
        }
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384" => {
            cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
        }
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305" => {
            cipher_suite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
        }
        _ => return None,
    })
}

/// Parse a comma-separated cipher-suite preference list, preserving order.
///
/// Fails on the first unrecognized name; an empty segment is unrecognized
/// too, so stray commas do not parse cleanly.
pub fn parse_ciphers(list: &str) -> Result<Vec<SupportedCipherSuite>, Error> {
    list.split(',')
        .map(str::trim)
        .map(|name| lookup_cipher(name).ok_or_else(|| Error::UnsupportedCipher(name.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_version_names_resolve() {
        for name in ["tls10", "tls11", "tls12", "tls13"] {
            lookup_min_version(name).unwrap();
        }
        assert!(matches!(
            lookup_min_version("tlsBOGUS"),
            Err(Error::UnsupportedTlsVersion(_))
        ));
    }

    #[test]
    fn historical_versions_clamp_to_tls12_floor() {
        let versions =
            |floor: MinVersion| -> Vec<_> { floor.protocol_versions().iter().map(|v| v.version).collect() };
        assert_eq!(versions(MinVersion::Tls10), versions(MinVersion::Tls12));
        assert_eq!(MinVersion::Tls13.protocol_versions().len(), 1);
    }

    #[test]
    fn parse_ciphers_preserves_order() {
        let parsed = parse_ciphers(
            "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        )
        .unwrap();
        let got: Vec<_> = parsed.iter().map(|c| c.suite()).collect();
        assert_eq!(
            got,
            vec![
                cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384.suite(),
                cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256.suite(),
            ]
        );
    }

    #[test]
    fn parse_ciphers_rejects_unknown_name() {
        let err = parse_ciphers("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,cipherX").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCipher(name) if name == "cipherX"));
    }

    #[test]
    fn parse_ciphers_rejects_empty_segments() {
        let err = parse_ciphers("TLS_AES_128_GCM_SHA256,,").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCipher(name) if name.is_empty()));
    }
}
