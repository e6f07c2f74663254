//! TLS settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings value (already parsed by the owning service)
//!     → validation.rs (cross-field checks, name lookups)
//!     → loader (trust anchors + keypair read from disk)
//!     → snapshot (validated, immutable)
//!     → published atomically by the Configurator
//! ```
//!
//! # Design Decisions
//! - A settings value is immutable once submitted; policy changes submit a
//!   whole new value
//! - All fields default so a minimal settings document works
//! - Validation separates cross-field checks from file loading; neither has
//!   any effect until both succeed

pub mod lookup;
pub mod schema;
pub(crate) mod validation;

pub use lookup::{lookup_min_version, parse_ciphers, MinVersion};
pub use schema::TlsSettings;
