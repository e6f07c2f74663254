//! TLS policy engine.
//!
//! # Data Flow
//! ```text
//! TlsSettings
//!     → configurator.rs (validate, load, publish snapshot)
//!     → loader.rs (trust anchors + keypair from disk)
//!     → snapshot (immutable, versioned)
//!
//! Listener side: incoming_rpc_config() / incoming_https_config()
//!     → server_config() per accepted connection (hot reload)
//! Dial side: outgoing_rpc_wrapper(dc).wrap(conn)
//!     → handshake + datacenter-scoped peer-name check
//! ```

pub(crate) mod configurator;
pub(crate) mod loader;
pub(crate) mod verify;
pub(crate) mod wrapper;

pub use configurator::{CheckTlsConfig, Configurator, IncomingTlsConfig};
pub use wrapper::{wrap_tls_client, MaybeTlsStream, OutgoingRpcWrapper};
