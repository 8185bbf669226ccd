//! Parsed certificate material handed to the binding reconciler.

use crate::composer::CertificateHandle;
use crate::identity::CertificateIdentity;
use chrono::{DateTime, Utc};
use std::fmt;
use zeroize::Zeroizing;

/// Everything known about one inbound certificate.
///
/// Built once per certificate event and read-only afterwards. `Debug`
/// output never includes the password or private key material.
#[derive(Clone)]
pub struct CertificateMaterial {
    raw_bytes: Vec<u8>,
    thumbprint: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    host_names: Vec<String>,
    password: Zeroizing<String>,
    private_key_pem: Option<Zeroizing<String>>,
    private_key_pfx: Option<Zeroizing<Vec<u8>>>,
}

impl CertificateMaterial {
    /// Starts building material for the certificate described by
    /// `identity`. `raw_bytes` is what gets sent to the management API
    /// (normally the PFX archive).
    pub fn builder(
        identity: &CertificateIdentity,
        raw_bytes: impl Into<Vec<u8>>,
        password: impl Into<String>,
    ) -> CertificateMaterialBuilder {
        CertificateMaterialBuilder {
            material: CertificateMaterial {
                raw_bytes: raw_bytes.into(),
                thumbprint: identity.thumbprint().to_lowercase(),
                not_before: identity.not_before(),
                not_after: identity.not_after(),
                host_names: identity.subject_alternative_names().to_vec(),
                password: Zeroizing::new(password.into()),
                private_key_pem: None,
                private_key_pfx: None,
            },
        }
    }

    /// Material for a handle, with the handle's SANs as host names.
    pub fn from_handle(
        handle: &CertificateHandle,
        raw_bytes: impl Into<Vec<u8>>,
        password: impl Into<String>,
    ) -> CertificateMaterialBuilder {
        Self::builder(handle.identity(), raw_bytes, password)
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Lower-case hex thumbprint.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Lower-cased host names in first-seen order, without duplicates.
    pub fn host_names(&self) -> &[String] {
        &self.host_names
    }

    /// Returns true if `host_name` is covered, ignoring ASCII case.
    pub fn covers(&self, host_name: &str) -> bool {
        self.host_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(host_name))
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn private_key_pem(&self) -> Option<&str> {
        self.private_key_pem.as_deref().map(String::as_str)
    }

    pub fn private_key_pfx(&self) -> Option<&[u8]> {
        self.private_key_pfx.as_deref().map(Vec::as_slice)
    }
}

impl fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("thumbprint", &self.thumbprint)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("host_names", &self.host_names)
            .field("raw_bytes", &format_args!("[{} bytes]", self.raw_bytes.len()))
            .field("password", &"[REDACTED]")
            .field(
                "private_key_pem",
                &self.private_key_pem.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "private_key_pfx",
                &self.private_key_pfx.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Builder for [`CertificateMaterial`].
#[derive(Debug)]
pub struct CertificateMaterialBuilder {
    material: CertificateMaterial,
}

impl CertificateMaterialBuilder {
    /// Adds a host name (lower-cased) unless it is already covered.
    pub fn host_name(mut self, host_name: &str) -> Self {
        let host_name = host_name.trim().to_lowercase();
        if !host_name.is_empty() && !self.material.host_names.contains(&host_name) {
            self.material.host_names.push(host_name);
        }
        self
    }

    pub fn private_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.material.private_key_pem = Some(Zeroizing::new(pem.into()));
        self
    }

    pub fn private_key_pfx(mut self, pfx: impl Into<Vec<u8>>) -> Self {
        self.material.private_key_pfx = Some(Zeroizing::new(pfx.into()));
        self
    }

    pub fn build(self) -> CertificateMaterial {
        self.material
    }
}
