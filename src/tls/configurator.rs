//! Versioned TLS policy state and the protocol-specific config builders.
//!
//! # Responsibilities
//! - Validate and load a settings value into an immutable snapshot
//! - Publish snapshots atomically under concurrent readers
//! - Derive the four TLS configuration views from the current snapshot
//!
//! # Design Decisions
//! - Copy-on-write snapshots via `arc-swap`; readers never block writers and
//!   always observe one internally consistent snapshot
//! - Updates are all-or-nothing: a rejected settings value leaves both the
//!   snapshot and the version counter untouched
//! - Builders read the current snapshot on every call and never cache, so
//!   listeners pick up updates on the next accepted connection

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use rustls::crypto::CryptoProvider;
use rustls::server::{ClientHello, ResolvesServerCert, WebPkiClientVerifier};
use rustls::sign::CertifiedKey;
use rustls::{
    ClientConfig, ProtocolVersion, RootCertStore, ServerConfig, SupportedCipherSuite,
    SupportedProtocolVersion,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsAcceptor;

use crate::error::Error;
use crate::settings::lookup::{lookup_cipher, lookup_min_version};
use crate::settings::validation::validate;
use crate::settings::{MinVersion, TlsSettings};
use crate::tls::loader::{load_ca_pool, load_keypair, KeyPair};
use crate::tls::verify::ChainOnlyVerifier;

/// Versioned, concurrency-safe TLS policy for one agent.
///
/// Cheap to clone; all clones share the same state. Collaborators hold a
/// clone and derive fresh configuration views whenever they need one.
#[derive(Clone)]
pub struct Configurator {
    inner: Arc<Inner>,
}

struct Inner {
    snapshot: ArcSwap<Snapshot>,
    // Serializes writers; readers go through the ArcSwap unlocked.
    update_lock: Mutex<()>,
}

/// One complete, immutable unit of policy state.
pub(crate) struct Snapshot {
    pub(crate) settings: TlsSettings,
    keypair: Option<KeyPair>,
    ca_pool: Option<RootCertStore>,
    cipher_suites: Vec<SupportedCipherSuite>,
    min_version: Option<MinVersion>,
    version: u64,
}

impl Configurator {
    /// Validate and install the first snapshot at version 1.
    ///
    /// There is no valid fallback state, so a failure here is fatal to the
    /// owning process.
    pub fn new(settings: TlsSettings) -> Result<Self, Error> {
        let snapshot = Snapshot::build(settings, 1)?;
        Ok(Self {
            inner: Arc::new(Inner {
                snapshot: ArcSwap::from_pointee(snapshot),
                update_lock: Mutex::new(()),
            }),
        })
    }

    /// Validate, load, and atomically install a new settings value.
    ///
    /// On failure the previous snapshot stays active and the version counter
    /// does not move; the last-known-good configuration keeps serving.
    pub fn update(&self, settings: TlsSettings) -> Result<(), Error> {
        let _guard = self
            .inner
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let version = self.inner.snapshot.load().version + 1;
        match Snapshot::build(settings, version) {
            Ok(snapshot) => {
                self.inner.snapshot.store(Arc::new(snapshot));
                tracing::info!(version, "TLS configuration updated");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected TLS configuration update");
                Err(err)
            }
        }
    }

    /// Version of the active snapshot. Starts at 1, increments by exactly 1
    /// on every successful update, including no-op updates.
    pub fn version(&self) -> u64 {
        self.inner.snapshot.load().version
    }

    /// Copy of the active settings value.
    pub fn settings(&self) -> TlsSettings {
        self.inner.snapshot.load().settings.clone()
    }

    /// Number of certificates in the active trust-anchor pool, 0 if none is
    /// configured.
    pub fn trust_anchor_count(&self) -> usize {
        self.inner
            .snapshot
            .load()
            .ca_pool
            .as_ref()
            .map_or(0, RootCertStore::len)
    }

    pub(crate) fn current(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    /// Listener-side configuration for the internal RPC protocol.
    pub fn incoming_rpc_config(&self) -> IncomingTlsConfig {
        IncomingTlsConfig {
            configurator: self.clone(),
            for_https: false,
        }
    }

    /// Listener-side configuration for the external HTTPS interface.
    pub fn incoming_https_config(&self) -> IncomingTlsConfig {
        IncomingTlsConfig {
            configurator: self.clone(),
            for_https: true,
        }
    }

    /// Dial-side configuration for outbound RPC.
    ///
    /// `None` means the caller should use a plain connection: TLS is
    /// opportunistic and enabled by either `verify_outgoing` or the mere
    /// presence of a trust-anchor source.
    pub fn outgoing_rpc_config(&self) -> Result<Option<Arc<ClientConfig>>, Error> {
        self.current().outgoing_rpc_config()
    }

    /// Dial-side configuration for agent health checks.
    ///
    /// This auxiliary path is deliberately decoupled from the cluster's main
    /// verification policy: the name check is controlled solely by
    /// `skip_verify`, and a dial name is only suggested when
    /// `enable_agent_tls_for_checks` is set.
    pub fn outgoing_tls_config_for_check(&self, skip_verify: bool) -> Result<CheckTlsConfig, Error> {
        let snapshot = self.current();
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let client_config = snapshot.client_config(roots, skip_verify, false)?;
        let server_name = if snapshot.settings.enable_agent_tls_for_checks {
            snapshot
                .settings
                .server_name
                .clone()
                .or_else(|| snapshot.settings.node_name.clone())
        } else {
            None
        };
        Ok(CheckTlsConfig {
            client_config,
            server_name,
            skip_hostname_verification: skip_verify,
        })
    }
}

impl std::fmt::Debug for Configurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.load();
        f.debug_struct("Configurator")
            .field("version", &snapshot.version)
            .field("settings", &snapshot.settings)
            .finish()
    }
}

/// Listener-side handle for one inbound protocol.
///
/// [`IncomingTlsConfig::server_config`] is the per-connection callback: it
/// re-reads the then-current snapshot, so sockets accepted after an update
/// handshake with the new material without the listener re-binding.
#[derive(Debug, Clone)]
pub struct IncomingTlsConfig {
    configurator: Configurator,
    for_https: bool,
}

impl IncomingTlsConfig {
    /// Build a fresh engine configuration from the current snapshot.
    ///
    /// Call once per accepted connection, before the handshake.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>, Error> {
        self.configurator.current().server_config(self.for_https)
    }

    /// Perform the server-side handshake on an accepted connection using the
    /// then-current snapshot.
    pub async fn accept<S>(&self, stream: S) -> Result<tokio_rustls::server::TlsStream<S>, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let acceptor = TlsAcceptor::from(self.server_config()?);
        acceptor.accept(stream).await.map_err(Error::Handshake)
    }
}

/// Dial-side configuration for the health-check path.
#[derive(Debug, Clone)]
pub struct CheckTlsConfig {
    /// Ready-to-use engine configuration.
    pub client_config: Arc<ClientConfig>,
    /// Name to dial with, when `enable_agent_tls_for_checks` suggests one.
    pub server_name: Option<String>,
    /// Exactly the `skip_verify` argument; chain trust is still verified.
    pub skip_hostname_verification: bool,
}

impl Snapshot {
    /// Validate a settings value and load all derived material, or fail
    /// without side effects.
    pub(crate) fn build(settings: TlsSettings, version: u64) -> Result<Self, Error> {
        validate(&settings)?;
        let min_version = settings
            .tls_min_version
            .as_deref()
            .map(lookup_min_version)
            .transpose()?;
        let cipher_suites = settings
            .cipher_suites
            .iter()
            .map(|name| {
                lookup_cipher(name).ok_or_else(|| Error::UnsupportedCipher(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let keypair = load_keypair(settings.cert_file.as_deref(), settings.key_file.as_deref())?;
        let ca_pool = load_ca_pool(settings.ca_file.as_deref(), settings.ca_path.as_deref())?;
        let snapshot = Self {
            settings,
            keypair,
            ca_pool,
            cipher_suites,
            min_version,
            version,
        };
        // A cipher list with no suite at or above the version floor would
        // make every later config derivation fail; reject it here instead.
        if snapshot.protocol_versions().is_empty() {
            return Err(Error::IncompatibleCipherSuites);
        }
        Ok(snapshot)
    }

    fn crypto_provider(&self) -> Arc<CryptoProvider> {
        let base = rustls::crypto::ring::default_provider();
        if self.cipher_suites.is_empty() {
            Arc::new(base)
        } else {
            Arc::new(CryptoProvider {
                cipher_suites: self.cipher_suites.clone(),
                ..base
            })
        }
    }

    fn protocol_versions(&self) -> Vec<&'static SupportedProtocolVersion> {
        let floor = self.min_version.unwrap_or(MinVersion::Tls12);
        let versions = floor.protocol_versions();
        if self.cipher_suites.is_empty() {
            return versions.to_vec();
        }
        // A protocol version with no usable suite would make the builder
        // reject the whole configuration.
        versions
            .iter()
            .copied()
            .filter(|version| {
                self.cipher_suites.iter().any(|suite| match suite {
                    SupportedCipherSuite::Tls12(_) => {
                        version.version == ProtocolVersion::TLSv1_2
                    }
                    SupportedCipherSuite::Tls13(_) => {
                        version.version == ProtocolVersion::TLSv1_3
                    }
                })
            })
            .collect()
    }

    fn requires_client_cert(&self, for_https: bool) -> bool {
        self.settings.verify_incoming
            || if for_https {
                self.settings.verify_incoming_https
            } else {
                self.settings.verify_incoming_rpc
            }
    }

    /// Engine configuration for an inbound listener.
    pub(crate) fn server_config(&self, for_https: bool) -> Result<Arc<ServerConfig>, Error> {
        let provider = self.crypto_provider();
        let versions = self.protocol_versions();
        let builder = ServerConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(&versions)?;

        let builder = if self.requires_client_cert(for_https) {
            // Validation guarantees a pool whenever a verify flag is set.
            let pool = self.ca_pool.clone().ok_or(Error::MissingIncomingCa)?;
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(pool), provider).build()?;
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        let resolver = SnapshotCertResolver {
            certified: self.keypair.as_ref().map(KeyPair::certified),
        };
        Ok(Arc::new(builder.with_cert_resolver(Arc::new(resolver))))
    }

    /// Engine configuration for outbound RPC, or `None` for plaintext.
    pub(crate) fn outgoing_rpc_config(&self) -> Result<Option<Arc<ClientConfig>>, Error> {
        if !self.settings.verify_outgoing && self.ca_pool.is_none() {
            return Ok(None);
        }
        let roots = self.ca_pool.clone().ok_or(Error::MissingOutgoingCa)?;
        let skip_hostname = !self.settings.verify_server_hostname;
        self.client_config(roots, skip_hostname, true).map(Some)
    }

    fn client_config(
        &self,
        roots: RootCertStore,
        skip_hostname: bool,
        with_identity: bool,
    ) -> Result<Arc<ClientConfig>, Error> {
        let provider = self.crypto_provider();
        let versions = self.protocol_versions();
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(&versions)?;

        let builder = if skip_hostname {
            let verifier = ChainOnlyVerifier::new(roots, provider)?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
        } else {
            builder.with_root_certificates(roots)
        };

        let config = match &self.keypair {
            Some(keypair) if with_identity => {
                builder.with_client_auth_cert(keypair.chain(), keypair.private_key())?
            }
            _ => builder.with_no_client_auth(),
        };
        Ok(Arc::new(config))
    }
}

/// Presents the snapshot's identity to inbound handshakes, or nothing when
/// no keypair is configured (the handshake then fails, config building does
/// not).
#[derive(Debug)]
struct SnapshotCertResolver {
    certified: Option<Arc<CertifiedKey>>,
}

impl ResolvesServerCert for SnapshotCertResolver {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.certified.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_snapshot(settings: TlsSettings) -> Snapshot {
        Snapshot {
            settings,
            keypair: None,
            ca_pool: None,
            cipher_suites: Vec::new(),
            min_version: None,
            version: 1,
        }
    }

    #[test]
    fn client_cert_requirement_honors_protocol_flags() {
        let shared = bare_snapshot(TlsSettings {
            verify_incoming: true,
            ..TlsSettings::default()
        });
        assert!(shared.requires_client_cert(false));
        assert!(shared.requires_client_cert(true));

        let rpc_only = bare_snapshot(TlsSettings {
            verify_incoming_rpc: true,
            ..TlsSettings::default()
        });
        assert!(rpc_only.requires_client_cert(false));
        assert!(!rpc_only.requires_client_cert(true));

        let https_only = bare_snapshot(TlsSettings {
            verify_incoming_https: true,
            ..TlsSettings::default()
        });
        assert!(!https_only.requires_client_cert(false));
        assert!(https_only.requires_client_cert(true));
    }

    #[test]
    fn tls13_floor_drops_tls12() {
        let mut snapshot = bare_snapshot(TlsSettings::default());
        assert_eq!(snapshot.protocol_versions().len(), 2);
        snapshot.min_version = Some(MinVersion::Tls13);
        let versions = snapshot.protocol_versions();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, ProtocolVersion::TLSv1_3);
    }

    #[test]
    fn cipher_list_narrows_protocol_versions() {
        let mut snapshot = bare_snapshot(TlsSettings::default());
        snapshot.cipher_suites =
            vec![lookup_cipher("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256").unwrap()];
        let versions = snapshot.protocol_versions();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, ProtocolVersion::TLSv1_2);
    }

    #[test]
    fn outgoing_config_is_opportunistic() {
        let snapshot = bare_snapshot(TlsSettings::default());
        assert!(snapshot.outgoing_rpc_config().unwrap().is_none());
    }
}
