//! certbridge provisions DNSimple-issued TLS certificates onto web
//! application hostnames.
//!
//! Two entry points drive the crate:
//!
//! - [`WebhookProcessor`] turns a `certificate.issue` webhook into stored
//!   certificate blobs, including a password-protected PKCS#12 archive
//! - [`CertificateBinder`] reads such an archive and rebinds every covered
//!   hostname that currently carries a different certificate
//!
//! Certificate handling lives in [`certbridge_cert`], collaborators in
//! [`certbridge_client`] and errors, configuration and logging in
//! [`certbridge_core`].

pub mod binder;
pub mod naming;
pub mod payload;
pub mod webhook;

pub use binder::{BindOutcome, BinderOptions, CertificateBinder, SkipReason};
pub use naming::{is_bindable_blob_name, BlobNames, CERTIFICATES_CONTAINER};
pub use payload::{WebhookPayload, WebhookResult};
pub use webhook::WebhookProcessor;

pub use certbridge_core::{AppConfig, CertBridgeError, Result};
