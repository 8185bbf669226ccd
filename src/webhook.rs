//! Issuance pipeline driven by DNSimple webhooks.
//!
//! A `certificate.issue` event is turned into a set of blobs: the chain,
//! the server certificate, the root, the PKCS#1 private key and a
//! password-protected PKCS#12 archive. The archive is what the binder picks
//! up afterwards.

use crate::binder::COMMON_NAME_METADATA;
use crate::naming::{BlobNames, CERTIFICATES_CONTAINER};
use crate::payload::{WebhookPayload, WebhookResult};
use certbridge_cert::{compose_private, export_pfx, CertificateMaterial};
use certbridge_client::{BlobStore, CertificateSource, DnsimpleClient, FileSystemBlobStore};
use certbridge_core::config::AppConfig;
use certbridge_core::error::{CertificateError, Result};
use certbridge_core::types::CertificateId;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

const BAD_REQUEST: &str = "Bad request.";
const INTERNAL_SERVER_ERROR: &str = "Internal server error.";

/// Handles inbound webhook bodies.
pub struct WebhookProcessor {
    password: Zeroizing<String>,
    container: String,
    source: Arc<dyn CertificateSource>,
    store: Arc<dyn BlobStore>,
}

impl WebhookProcessor {
    pub fn new(
        password: impl Into<String>,
        source: Arc<dyn CertificateSource>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
            container: CERTIFICATES_CONTAINER.to_string(),
            source,
            store,
        }
    }

    /// Processor backed by DNSimple and the file system blob store.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = DnsimpleClient::new(&config.dnsimple)?;
        let store = FileSystemBlobStore::new(config.storage.root.clone());

        Ok(Self::new(
            config.certificates.password.clone(),
            Arc::new(source),
            Arc::new(store),
        )
        .with_container(config.certificates.container.clone()))
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Handles one webhook body and describes the response to send back.
    ///
    /// Never fails: undeserializable bodies map to 400, processing failures
    /// to 500 and everything else, processed or not, to 200.
    pub async fn process(&self, body: &str) -> WebhookResult {
        info!("Received DNSimple webhook");

        let payload = match serde_json::from_str::<Option<WebhookPayload>>(body) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!("DNSimple webhook payload was empty");
                return Self::result(None, BAD_REQUEST, false, 400);
            }
            Err(e) => {
                warn!(error = %e, "Failed to deserialize DNSimple webhook payload");
                return Self::result(None, BAD_REQUEST, false, 400);
            }
        };

        let request_id = payload.request_id.clone();

        info!(
            request_id = request_id.as_deref().unwrap_or_default(),
            event = payload.name.as_deref().unwrap_or_default(),
            api_version = payload.api_version.as_deref().unwrap_or_default(),
            "Processing DNSimple webhook"
        );

        let processed = match self.process_payload(&payload).await {
            Ok(processed) => processed,
            Err(e) => {
                error!(
                    request_id = request_id.as_deref().unwrap_or_default(),
                    error = %e,
                    "Failed to process DNSimple webhook"
                );
                return Self::result(request_id, INTERNAL_SERVER_ERROR, false, 500);
            }
        };

        let message = format!(
            "Webhook '{}' acknowledged.",
            request_id.as_deref().unwrap_or_default()
        );
        Self::result(request_id, &message, processed, 200)
    }

    /// Runs the issuance pipeline for supported events.
    ///
    /// Returns `false` for events that are acknowledged without action.
    pub async fn process_payload(&self, payload: &WebhookPayload) -> Result<bool> {
        if let Err(unsupported) = payload.ensure_certificate_issue() {
            info!(reason = %unsupported, "Ignoring DNSimple webhook");
            return Ok(false);
        }

        let id = payload.certificate_id()?;
        let uploaded = self.issue(&id).await?;

        info!(certificate = %id, uploaded, "Processed issued certificate");
        Ok(true)
    }

    /// Fetches, composes and uploads certificate `id`. Returns the number
    /// of blobs written.
    pub async fn issue(&self, id: &CertificateId) -> Result<usize> {
        info!(certificate = %id, "Fetching issued certificate");

        let chain = self.source.fetch_chain(id).await?;
        let private_key = Zeroizing::new(self.source.fetch_private_key(id).await?);

        let server = chain
            .server
            .as_deref()
            .ok_or_else(|| CertificateError::format("Certificate chain has no server certificate"))?;

        let handle = compose_private(server, &private_key)?;
        let pfx = export_pfx(&handle, &self.password)?;
        let identity = handle.identity();

        let material = CertificateMaterial::from_handle(&handle, pfx.clone(), self.password.as_str())
            .host_name(identity.common_name())
            .private_key_pem(private_key.as_str())
            .private_key_pfx(pfx)
            .build();

        let mut metadata = identity.metadata();
        metadata.insert(COMMON_NAME_METADATA, identity.common_name());

        let names = BlobNames::for_certificate(identity);
        let mut uploaded = 0;

        for (index, intermediate) in chain.chain.iter().enumerate() {
            let name = names.chain(index, chain.chain.len());
            self.store
                .upload_text(&self.container, &name, intermediate, &metadata)
                .await?;
            uploaded += 1;
        }

        self.store
            .upload_text(&self.container, &names.cert(), server, &metadata)
            .await?;
        uploaded += 1;

        if let Some(root) = chain.root.as_deref() {
            self.store
                .upload_text(&self.container, &names.root(), root, &metadata)
                .await?;
            uploaded += 1;
        } else {
            debug!(certificate = %id, "Certificate chain has no root certificate");
        }

        if let Some(pem) = material.private_key_pem() {
            self.store
                .upload_text(&self.container, &names.private_key_pem(), pem, &metadata)
                .await?;
            uploaded += 1;
        }

        if let Some(pfx) = material.private_key_pfx() {
            self.store
                .upload_bytes(&self.container, &names.private_key_pfx(), pfx, &metadata)
                .await?;
            uploaded += 1;
        }

        info!(
            container = %self.container,
            prefix = names.prefix(),
            thumbprint = material.thumbprint(),
            uploaded,
            "Uploaded certificate blobs"
        );

        Ok(uploaded)
    }

    fn result(
        request_id: Option<String>,
        message: &str,
        processed: bool,
        status_code: u16,
    ) -> WebhookResult {
        WebhookResult {
            request_id,
            message: message.to_string(),
            processed,
            status_code,
        }
    }
}

impl fmt::Debug for WebhookProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookProcessor")
            .field("password", &"[REDACTED]")
            .field("container", &self.container)
            .finish()
    }
}
