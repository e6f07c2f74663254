//! TLS policy management for a clustered agent.
//!
//! One [`Configurator`] owns the agent's TLS policy: it validates operator
//! settings, loads certificate material, and derives the four trust
//! directions an agent needs: incoming RPC, incoming HTTPS, outgoing RPC,
//! and outgoing health checks. Settings hot-reload through
//! [`Configurator::update`] without restarting listeners: every accepted
//! connection and every dial reads the then-current snapshot.
//!
//! Outbound RPC peers are authenticated against a datacenter-scoped name
//! (`server.<datacenter>.<domain>`) via [`Configurator::outgoing_rpc_wrapper`]
//! rather than a single static hostname.

pub mod error;
pub mod settings;
pub mod tls;

pub use error::Error;
pub use settings::{lookup_min_version, parse_ciphers, MinVersion, TlsSettings};
pub use tls::{
    wrap_tls_client, CheckTlsConfig, Configurator, IncomingTlsConfig, MaybeTlsStream,
    OutgoingRpcWrapper,
};
