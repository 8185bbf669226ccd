//! Certificate material engine for certbridge.
//!
//! Unwraps PKCS#1 RSA private keys from PEM, decodes their DER layout,
//! combines them with X.509 certificates, exports PKCS#12 archives and
//! extracts the identity facts (thumbprint, validity window, Subject
//! Alternative Names) the binding reconciler works from.
//!
//! ```no_run
//! use certbridge_cert::{compose_private, export_pfx};
//!
//! # fn run(cert_pem: &str, key_pem: &str) -> certbridge_core::Result<()> {
//! let handle = compose_private(cert_pem, key_pem)?;
//! println!("thumbprint: {}", handle.thumbprint());
//! let pfx = export_pfx(&handle, "password")?;
//! # let _ = pfx;
//! # Ok(())
//! # }
//! ```

pub mod composer;
pub mod identity;
pub mod material;
pub mod pem;
pub mod pkcs1;
pub mod validity;

pub use composer::{
    compose_private, compose_with_parameters, create_public_only, export_pfx, CertificateHandle,
};
pub use identity::CertificateIdentity;
pub use material::{CertificateMaterial, CertificateMaterialBuilder};
pub use pem::decode_rsa_private_key_pem;
pub use pkcs1::{decode_rsa_private_key_der, RsaKeyParameters};
pub use validity::{check_validity, is_valid_now, Clock, FixedClock, SystemClock};
