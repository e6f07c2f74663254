//! TLS settings schema.
//!
//! This is the operator-facing input to the configurator. All types derive
//! Serde traits so the owning service can embed them in its config file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Operator-supplied TLS policy for one agent.
///
/// A settings value is immutable once submitted; changing policy means
/// submitting a whole new value through [`Configurator::update`].
///
/// [`Configurator::update`]: crate::Configurator::update
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Require and verify client certificates on both inbound protocols.
    pub verify_incoming: bool,

    /// Require and verify client certificates on the RPC listener only.
    pub verify_incoming_rpc: bool,

    /// Require and verify client certificates on the HTTPS listener only.
    pub verify_incoming_https: bool,

    /// Verify the certificate chain of outbound RPC peers.
    pub verify_outgoing: bool,

    /// Let the TLS engine check the peer name on outbound handshakes.
    /// When false, chain verification still runs; only the name check is
    /// deferred to the datacenter-scoped wrapper.
    pub verify_server_hostname: bool,

    /// PEM bundle of trust anchors. Takes exclusive precedence over
    /// `ca_path` when both are set.
    pub ca_file: Option<PathBuf>,

    /// Directory of PEM trust-anchor files, read only if `ca_file` is unset.
    pub ca_path: Option<PathBuf>,

    /// PEM certificate chain for this agent's identity.
    pub cert_file: Option<PathBuf>,

    /// PEM private key matching `cert_file`.
    pub key_file: Option<PathBuf>,

    /// Minimum protocol version: "tls10", "tls11", "tls12" or "tls13".
    /// Engine default when unset.
    pub tls_min_version: Option<String>,

    /// Ordered cipher-suite preference by canonical name. Engine default
    /// when empty.
    pub cipher_suites: Vec<String>,

    /// This agent's node name, fallback dial name for health checks.
    pub node_name: Option<String>,

    /// Explicit dial name for health checks, preferred over `node_name`.
    pub server_name: Option<String>,

    /// Cluster domain suffix used to derive expected RPC peer names
    /// ("server.<datacenter>.<domain>").
    pub domain: Option<String>,

    /// Dial health-check targets over TLS using the settings above.
    pub enable_agent_tls_for_checks: bool,
}

impl TlsSettings {
    /// True if at least one trust-anchor source is configured.
    pub fn has_ca_source(&self) -> bool {
        self.ca_file.is_some() || self.ca_path.is_some()
    }

    /// True if any flag demands client-certificate verification somewhere.
    pub fn any_verify_incoming(&self) -> bool {
        self.verify_incoming || self.verify_incoming_rpc || self.verify_incoming_https
    }

    pub(crate) fn has_keypair_paths(&self) -> bool {
        self.cert_file.is_some() && self.key_file.is_some()
    }
}
