//! Certificate verification policies.
//!
//! Two pieces live here: a server-certificate verifier that keeps chain
//! verification but skips the engine's peer-name check (the name is checked
//! later, against a datacenter-scoped expectation known only at dial time),
//! and the datacenter-scoped name check itself.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{verify_server_name, WebPkiServerVerifier};
use rustls::crypto::CryptoProvider;
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use crate::error::Error;

/// Verifies the peer's chain against the configured trust anchors while
/// ignoring what names the certificate is valid for.
///
/// Chain-trust failures still abort the handshake.
#[derive(Debug)]
pub(crate) struct ChainOnlyVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ChainOnlyVerifier {
    pub(crate) fn new(
        roots: RootCertStore,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, Error> {
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider).build()?;
        Ok(Self { inner })
    }
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName
                | CertificateError::NotValidForNameContext { .. },
            )) => Ok(ServerCertVerified::assertion()),
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Build the expected peer name for an RPC dial into `datacenter`.
pub(crate) fn rpc_server_name(datacenter: &str, domain: &str) -> Result<ServerName<'static>, Error> {
    let name = format!("server.{datacenter}.{domain}");
    ServerName::try_from(name.clone())
        .map_err(|source| Error::InvalidServerName { name, source })
}

/// Match a peer's leaf certificate against the expected datacenter name
/// using standard certificate-hostname rules, wildcards included.
pub(crate) fn verify_peer_name(
    end_entity: &CertificateDer<'_>,
    expected: &ServerName<'_>,
    expected_name: &str,
    datacenter: &str,
) -> Result<(), Error> {
    let parsed = ParsedCertificate::try_from(end_entity)?;
    verify_server_name(&parsed, expected).map_err(|_| Error::HostnameMismatch {
        datacenter: datacenter.to_string(),
        expected: expected_name.to_string(),
    })
}
