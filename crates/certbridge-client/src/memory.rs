//! In-memory implementations of the collaborator traits, for tests and
//! local runs.

use crate::client::{AppServiceClient, BindingUpdate, BlobStore, CertificateSource};
use async_trait::async_trait;
use certbridge_core::error::{ClientError, Result};
use certbridge_core::types::{
    ApplicationTarget, Blob, CertificateChain, CertificateId, HostNameBindingSnapshot, Metadata,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Certificate source serving fixed chains and keys.
#[derive(Debug, Default)]
pub struct InMemoryCertificateSource {
    certificates: Mutex<HashMap<CertificateId, (CertificateChain, String)>>,
    calls: AtomicUsize,
}

impl InMemoryCertificateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: CertificateId, chain: CertificateChain, private_key: impl Into<String>) {
        self.certificates
            .lock()
            .insert(id, (chain, private_key.into()));
    }

    /// Number of fetch calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, id: &CertificateId) -> Result<(CertificateChain, String)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.certificates.lock().get(id).cloned().ok_or_else(|| {
            ClientError::UnexpectedStatus {
                url: format!("memory://certificates/{}", id),
                status: 404,
                body: "certificate not found".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl CertificateSource for InMemoryCertificateSource {
    async fn fetch_chain(&self, id: &CertificateId) -> Result<CertificateChain> {
        Ok(self.lookup(id)?.0)
    }

    async fn fetch_private_key(&self, id: &CertificateId) -> Result<String> {
        Ok(self.lookup(id)?.1)
    }
}

/// A binding update as received by [`InMemoryAppServiceClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub application: String,
    pub host_name: String,
    pub thumbprint: String,
    pub certificate_len: usize,
}

#[derive(Debug)]
struct Application {
    target: ApplicationTarget,
    bindings: Vec<HostNameBindingSnapshot>,
}

/// Application management double.
///
/// Updates are applied to the stored bindings, so a second reconciliation
/// pass sees the new thumbprints.
#[derive(Debug, Default)]
pub struct InMemoryAppServiceClient {
    applications: Mutex<Vec<Application>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    calls: AtomicUsize,
    failing_host: Mutex<Option<String>>,
}

impl InMemoryAppServiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an application with `(host_name, thumbprint)` bindings.
    pub fn with_application<'a>(
        self,
        target: ApplicationTarget,
        bindings: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|(host, thumbprint)| {
                HostNameBindingSnapshot::new(host, thumbprint.map(str::to_string))
            })
            .collect();
        self.applications
            .lock()
            .push(Application { target, bindings });
        self
    }

    /// Makes every update for `host_name` fail.
    pub fn fail_updates_for(&self, host_name: impl Into<String>) {
        *self.failing_host.lock() = Some(host_name.into());
    }

    /// Updates received so far, in order.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().clone()
    }

    /// Number of calls of any kind.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current bindings of the named application.
    pub fn bindings(&self, application: &str) -> Vec<HostNameBindingSnapshot> {
        self.applications
            .lock()
            .iter()
            .find(|app| app.target.name == application)
            .map(|app| app.bindings.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AppServiceClient for InMemoryAppServiceClient {
    async fn list_applications(&self) -> Result<Vec<ApplicationTarget>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .applications
            .lock()
            .iter()
            .map(|app| app.target.clone())
            .collect())
    }

    async fn list_bindings(
        &self,
        application: &ApplicationTarget,
    ) -> Result<Vec<HostNameBindingSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bindings(&application.name))
    }

    async fn update_binding(&self, update: BindingUpdate<'_>) -> Result<ApplicationTarget> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_host.lock().as_deref() == Some(update.host_name) {
            return Err(ClientError::UnexpectedStatus {
                url: format!("memory://sites/{}", update.application.name),
                status: 500,
                body: "injected failure".to_string(),
            }
            .into());
        }

        let mut applications = self.applications.lock();
        let application = applications
            .iter_mut()
            .find(|app| app.target.id == update.application.id)
            .ok_or_else(|| {
                ClientError::invalid_argument(format!(
                    "unknown application '{}'",
                    update.application.name
                ))
            })?;

        let binding = application
            .bindings
            .iter_mut()
            .find(|binding| binding.host_name == update.host_name)
            .ok_or_else(|| {
                ClientError::invalid_argument(format!(
                    "application '{}' has no hostname '{}'",
                    update.application.name, update.host_name
                ))
            })?;
        binding.current_thumbprint = Some(update.thumbprint.to_string());

        self.updates.lock().push(RecordedUpdate {
            application: update.application.name.clone(),
            host_name: update.host_name.to_string(),
            thumbprint: update.thumbprint.to_string(),
            certificate_len: update.certificate.len(),
        });

        Ok(application.target.clone())
    }
}

/// Blob store double.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<(String, String), Blob>>,
    uploads: Mutex<Vec<String>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blob names in upload order.
    pub fn upload_order(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }

    pub fn get(&self, container: &str, name: &str) -> Option<Blob> {
        self.blobs
            .lock()
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload_bytes(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
        metadata: &Metadata,
    ) -> Result<()> {
        let blob = Blob {
            container: container.to_string(),
            name: name.to_string(),
            bytes: bytes.to_vec(),
            metadata: metadata.clone(),
        };
        self.blobs
            .lock()
            .insert((container.to_string(), name.to_string()), blob);
        self.uploads.lock().push(name.to_string());
        Ok(())
    }

    async fn download(&self, container: &str, name: &str) -> Result<Blob> {
        self.get(container, name).ok_or_else(|| {
            ClientError::BlobNotFound {
                container: container.to_string(),
                name: name.to_string(),
            }
            .into()
        })
    }
}
