//! Deterministic blob names for issued certificates.

use certbridge_cert::CertificateIdentity;

/// Container all certificate blobs are written to.
pub const CERTIFICATES_CONTAINER: &str = "certificates";

/// Suffix of the blobs that trigger binding.
pub const PRIVATE_KEY_PFX_SUFFIX: &str = ".privkey.pfx";

/// Blob names sharing the `{common-name}_{thumbprint}_{yyyy-MM-dd}` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobNames {
    prefix: String,
}

impl BlobNames {
    /// Names for `identity`. Dots in the common name become dashes, the
    /// thumbprint is lower-case and the date is the UTC `not_before` day.
    pub fn for_certificate(identity: &CertificateIdentity) -> Self {
        Self::new(
            identity.common_name(),
            identity.thumbprint(),
            &identity.not_before().format("%Y-%m-%d").to_string(),
        )
    }

    pub fn new(common_name: &str, thumbprint: &str, date: &str) -> Self {
        Self {
            prefix: format!(
                "{}_{}_{}",
                common_name.replace('.', "-"),
                thumbprint.to_lowercase(),
                date
            ),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn cert(&self) -> String {
        format!("{}.cert.pem", self.prefix)
    }

    /// `.chain.pem` for a single intermediate, `.chain.{index}.pem` when
    /// there are several.
    pub fn chain(&self, index: usize, total: usize) -> String {
        if total == 1 {
            format!("{}.chain.pem", self.prefix)
        } else {
            format!("{}.chain.{}.pem", self.prefix, index)
        }
    }

    pub fn root(&self) -> String {
        format!("{}.root.pem", self.prefix)
    }

    pub fn private_key_pem(&self) -> String {
        format!("{}.privkey.pem", self.prefix)
    }

    pub fn private_key_pfx(&self) -> String {
        format!("{}{}", self.prefix, PRIVATE_KEY_PFX_SUFFIX)
    }
}

/// Returns true for blob names the binder should act on.
pub fn is_bindable_blob_name(name: &str) -> bool {
    name.len() > PRIVATE_KEY_PFX_SUFFIX.len() && name.ends_with(PRIVATE_KEY_PFX_SUFFIX)
}
