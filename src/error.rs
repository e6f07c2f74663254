//! Error types for TLS policy and connection wrapping.

use std::io;
use std::path::PathBuf;

use rustls_pki_types::InvalidDnsNameError;
use thiserror::Error;

/// Errors surfaced by the configurator and the connection wrappers.
///
/// Configuration variants are returned synchronously from construction and
/// update calls and never leave partial state behind. Handshake errors come
/// from the TLS engine as-is. [`Error::HostnameMismatch`] is raised only by
/// the outgoing RPC wrapper's datacenter check so callers can alert on
/// cross-datacenter identity confusion specifically.
#[derive(Debug, Error)]
pub enum Error {
    #[error("verify_outgoing is set but no CA certificates were configured (ca_file or ca_path)")]
    MissingOutgoingCa,

    #[error("verify_incoming is set but no CA certificates were configured (ca_file or ca_path)")]
    MissingIncomingCa,

    #[error("verify_incoming is set but no certificate/key pair was configured")]
    MissingIncomingIdentity,

    #[error("cert_file and key_file must either both be set or both be unset")]
    IncompleteKeyPair,

    #[error("unsupported TLS version {0:?}")]
    UnsupportedTlsVersion(String),

    #[error("unsupported cipher {0:?}")]
    UnsupportedCipher(String),

    #[error("cipher_suites has no suite usable at or above tls_min_version")]
    IncompatibleCipherSuites,

    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("no PEM certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0}")]
    MissingPrivateKey(PathBuf),

    #[error("rejected CA certificate from {path}: {source}")]
    BadCaCertificate { path: PathBuf, source: rustls::Error },

    #[error("certificate and key from {path} do not form a usable identity: {source}")]
    BadKeyPair { path: PathBuf, source: rustls::Error },

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to build certificate verifier: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),

    #[error("invalid server name {name:?}: {source}")]
    InvalidServerName {
        name: String,
        source: InvalidDnsNameError,
    },

    #[error("TLS handshake failed: {0}")]
    Handshake(io::Error),

    #[error("peer presented no certificate")]
    NoPeerCertificate,

    #[error("peer certificate is not valid for {expected:?} (datacenter {datacenter:?})")]
    HostnameMismatch {
        datacenter: String,
        expected: String,
    },
}
