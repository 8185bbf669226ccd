//! # certbridge core
//!
//! Core types, error handling, and configuration shared by the certbridge
//! crates.
//!
//! - **Types**: certificate identifiers, certificate chains, application
//!   targets, hostname binding snapshots, blobs and their metadata.
//! - **Errors**: serializable error enums built on `thiserror` for every
//!   failure mode, from malformed key material to collaborator failures.
//! - **Configuration**: YAML files with `CERTBRIDGE__*` environment
//!   overrides and validation.
//! - **Logging**: `tracing` subscriber setup in text or JSON form.
//!
//! ## Example
//!
//! ```
//! use certbridge_core::types::Metadata;
//!
//! let mut metadata = Metadata::new();
//! metadata.insert("CommonName", "example.com");
//! assert_eq!(metadata.get("commonname"), Some("example.com"));
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::AppConfig;
pub use error::{CertBridgeError, Result};
pub use types::{
    ApplicationTarget, Blob, CertificateChain, CertificateId, HostNameBindingSnapshot, Metadata,
};
