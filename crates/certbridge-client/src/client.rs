//! Capability traits for the services certbridge talks to.

use async_trait::async_trait;
use certbridge_core::types::{
    ApplicationTarget, Blob, CertificateChain, CertificateId, HostNameBindingSnapshot, Metadata,
};
use certbridge_core::Result;
use std::fmt;

/// Certificate authority that issued the certificates.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetches the PEM-encoded server certificate, root and intermediates.
    async fn fetch_chain(&self, id: &CertificateId) -> Result<CertificateChain>;

    /// Fetches the PEM-encoded private key.
    async fn fetch_private_key(&self, id: &CertificateId) -> Result<String>;
}

/// One TLS binding change sent to the application management API.
#[derive(Clone, Copy)]
pub struct BindingUpdate<'a> {
    /// Application that owns the hostname
    pub application: &'a ApplicationTarget,
    /// Hostname to bind
    pub host_name: &'a str,
    /// Lower-case thumbprint of the certificate
    pub thumbprint: &'a str,
    /// PKCS#12 archive of the certificate and key
    pub certificate: &'a [u8],
    /// Password protecting `certificate`
    pub password: &'a str,
}

impl fmt::Debug for BindingUpdate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingUpdate")
            .field("application", &self.application.name)
            .field("host_name", &self.host_name)
            .field("thumbprint", &self.thumbprint)
            .field("certificate", &format_args!("[{} bytes]", self.certificate.len()))
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Application management API.
///
/// Implementations must only change the thumbprint of the hostname named in
/// the update; hostnames are never created or removed.
#[async_trait]
pub trait AppServiceClient: Send + Sync {
    /// Lists every application that may carry certificate bindings.
    async fn list_applications(&self) -> Result<Vec<ApplicationTarget>>;

    /// Lists the hostnames of `application` with their bound thumbprints.
    async fn list_bindings(
        &self,
        application: &ApplicationTarget,
    ) -> Result<Vec<HostNameBindingSnapshot>>;

    /// Uploads the certificate and binds it to the hostname with SNI.
    async fn update_binding(&self, update: BindingUpdate<'_>) -> Result<ApplicationTarget>;
}

/// Durable object storage keyed by container and blob name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores UTF-8 text, replacing any existing blob.
    async fn upload_text(
        &self,
        container: &str,
        name: &str,
        text: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        self.upload_bytes(container, name, text.as_bytes(), metadata)
            .await
    }

    /// Stores raw bytes, replacing any existing blob.
    async fn upload_bytes(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
        metadata: &Metadata,
    ) -> Result<()>;

    /// Reads a blob with its metadata.
    async fn download(&self, container: &str, name: &str) -> Result<Blob>;
}
