//! Binds stored PKCS#12 certificates to the hostnames they cover.
//!
//! A bind pass reads one `.privkey.pfx` blob, checks the certificate's
//! validity window and then walks every application's hostname bindings:
//!
//! 1. hostnames the certificate does not cover are left alone
//! 2. hostnames without a bound thumbprint are left alone
//! 3. hostnames already bound to the thumbprint are left alone
//! 4. everything else is rebound to the certificate
//!
//! Running the same pass twice against unchanged applications performs no
//! updates the second time.

use crate::naming::is_bindable_blob_name;
use certbridge_cert::{check_validity, CertificateHandle, CertificateMaterial, Clock, SystemClock};
use certbridge_client::{AppServiceClient, AzureAppServiceClient, BindingUpdate, BlobStore};
use certbridge_core::config::{AppConfig, BinderConfig};
use certbridge_core::error::{CertificateError, ClientError, Result};
use certbridge_core::types::{ApplicationTarget, Blob};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Blob metadata key holding the certificate's common name.
pub const COMMON_NAME_METADATA: &str = "CommonName";

/// Tuning for [`CertificateBinder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderOptions {
    /// Applications reconciled at the same time. `1` walks them in order.
    pub max_concurrent_applications: usize,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self {
            max_concurrent_applications: 1,
        }
    }
}

impl From<&BinderConfig> for BinderOptions {
    fn from(config: &BinderConfig) -> Self {
        Self {
            max_concurrent_applications: config.max_concurrent_applications.max(1),
        }
    }
}

/// Why a certificate was not bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotYetValid { not_before: DateTime<Utc> },
    Expired { not_after: DateTime<Utc> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotYetValid { not_before } => {
                write!(f, "certificate is not valid until {}", not_before)
            }
            SkipReason::Expired { not_after } => write!(f, "certificate expired at {}", not_after),
        }
    }
}

/// Result of one bind operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// Bindings were reconciled; `updated` may be zero.
    Success { updated: usize },
    /// The certificate was rejected before any application was touched.
    Skipped { reason: SkipReason },
}

impl BindOutcome {
    /// Number of hostname bindings updated.
    pub fn updated(&self) -> usize {
        match self {
            BindOutcome::Success { updated } => *updated,
            BindOutcome::Skipped { .. } => 0,
        }
    }
}

/// Reconciles hostname bindings with stored certificates.
pub struct CertificateBinder {
    password: String,
    client: Arc<dyn AppServiceClient>,
    clock: Arc<dyn Clock>,
    options: BinderOptions,
}

impl CertificateBinder {
    pub fn new(
        password: impl Into<String>,
        client: Arc<dyn AppServiceClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            password: password.into(),
            client,
            clock,
            options: BinderOptions::default(),
        }
    }

    /// Binder backed by Azure App Service and the system clock.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = AzureAppServiceClient::new(&config.app_service)?;
        Ok(Self::new(
            config.certificates.password.clone(),
            Arc::new(client),
            Arc::new(SystemClock),
        )
        .with_options(BinderOptions::from(&config.binder)))
    }

    pub fn with_options(mut self, options: BinderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    /// Binds the PKCS#12 certificate in `blob` to every covered hostname.
    ///
    /// Validity window rejections are reported as [`BindOutcome::Skipped`].
    /// Everything else that goes wrong is logged and returned.
    ///
    /// # Errors
    ///
    /// A format error for empty or unreadable certificate bytes, raised
    /// before any collaborator is called, and any collaborator failure.
    pub async fn bind(&self, blob: &Blob) -> Result<BindOutcome> {
        match self.bind_blob(blob).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(blob = %blob.uri(), error = %e, "Failed to bind private certificate");
                Err(e)
            }
        }
    }

    /// Downloads `name` from `store` and binds it.
    pub async fn bind_from_store(
        &self,
        store: &dyn BlobStore,
        container: &str,
        name: &str,
    ) -> Result<BindOutcome> {
        if !is_bindable_blob_name(name) {
            return Err(ClientError::invalid_argument(format!(
                "blob '{}' is not a PKCS#12 certificate",
                name
            ))
            .into());
        }

        let blob = store.download(container, name).await?;
        self.bind(&blob).await
    }

    async fn bind_blob(&self, blob: &Blob) -> Result<BindOutcome> {
        if blob.bytes.is_empty() {
            warn!(blob = %blob.uri(), "Not processing blob as it contains no data");
            return Err(CertificateError::format("Certificate blob contains no data").into());
        }

        let handle = CertificateHandle::from_pfx(&blob.bytes, &self.password)?;

        match check_validity(&handle, self.clock.as_ref()) {
            Ok(()) => {}
            Err(CertificateError::NotYetValid { not_before, .. }) => {
                warn!(
                    thumbprint = %handle.thumbprint(),
                    not_before = %not_before,
                    "Cannot bind certificate because it is not valid yet"
                );
                return Ok(BindOutcome::Skipped {
                    reason: SkipReason::NotYetValid { not_before },
                });
            }
            Err(CertificateError::Expired { not_after, .. }) => {
                warn!(
                    thumbprint = %handle.thumbprint(),
                    not_after = %not_after,
                    "Cannot bind certificate because it has expired"
                );
                return Ok(BindOutcome::Skipped {
                    reason: SkipReason::Expired { not_after },
                });
            }
            Err(other) => return Err(other.into()),
        }

        let common_name = blob
            .metadata
            .get(COMMON_NAME_METADATA)
            .unwrap_or_else(|| handle.identity().common_name());

        let material =
            CertificateMaterial::from_handle(&handle, blob.bytes.clone(), self.password.as_str())
                .host_name(common_name)
                .build();

        let updated = self.reconcile(&material).await?;

        info!(
            thumbprint = %material.thumbprint(),
            blob = %blob.uri(),
            updated,
            "Bound certificate to App Service host names"
        );

        Ok(BindOutcome::Success { updated })
    }

    /// Updates every binding covered by `material` that carries a different
    /// thumbprint, and returns how many were updated.
    pub async fn reconcile(&self, material: &CertificateMaterial) -> Result<usize> {
        let applications = self.client.list_applications().await?;
        self.reconcile_applications(material, &applications).await
    }

    /// Same as [`reconcile`](Self::reconcile) for an already enumerated set
    /// of applications.
    pub async fn reconcile_applications(
        &self,
        material: &CertificateMaterial,
        applications: &[ApplicationTarget],
    ) -> Result<usize> {
        debug!(count = applications.len(), "Reconciling applications");

        if self.options.max_concurrent_applications <= 1 {
            let mut total = 0;
            for application in applications {
                match self.reconcile_application(application, material).await {
                    Ok(updated) => total += updated,
                    Err(e) => {
                        warn!(
                            application = %application.name,
                            updated = total,
                            "Stopping after partial binding update"
                        );
                        return Err(e);
                    }
                }
            }
            return Ok(total);
        }

        let counts: Vec<usize> = stream::iter(applications.iter())
            .map(|application| self.reconcile_application(application, material))
            .buffer_unordered(self.options.max_concurrent_applications)
            .try_collect()
            .await?;

        Ok(counts.into_iter().sum())
    }

    async fn reconcile_application(
        &self,
        application: &ApplicationTarget,
        material: &CertificateMaterial,
    ) -> Result<usize> {
        let bindings = self.client.list_bindings(application).await?;
        let mut updated = 0;

        for binding in &bindings {
            let host_name = binding.host_name.as_str();

            if !material.covers(host_name) {
                debug!(
                    thumbprint = %material.thumbprint(),
                    host_name,
                    "Certificate does not cover host name"
                );
                continue;
            }

            let Some(current) = binding
                .current_thumbprint
                .as_deref()
                .filter(|thumbprint| !thumbprint.is_empty())
            else {
                debug!(host_name, "No existing binding for host name");
                continue;
            };

            if current.eq_ignore_ascii_case(material.thumbprint()) {
                debug!(
                    thumbprint = %material.thumbprint(),
                    host_name,
                    "Certificate is already bound to host name"
                );
                continue;
            }

            self.client
                .update_binding(BindingUpdate {
                    application,
                    host_name,
                    thumbprint: material.thumbprint(),
                    certificate: material.raw_bytes(),
                    password: material.password(),
                })
                .await?;

            info!(
                thumbprint = %material.thumbprint(),
                host_name,
                application = %application.name,
                "Bound certificate to host name"
            );
            updated += 1;
        }

        info!(
            application = %application.name,
            updated,
            "Updated host name bindings"
        );

        Ok(updated)
    }
}

impl fmt::Debug for CertificateBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBinder")
            .field("password", &"[REDACTED]")
            .field("clock", &self.clock)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config_clamps_zero() {
        let config = BinderConfig {
            max_concurrent_applications: 0,
        };
        assert_eq!(BinderOptions::from(&config).max_concurrent_applications, 1);
    }

    #[test]
    fn test_skipped_outcome_counts_zero() {
        let outcome = BindOutcome::Skipped {
            reason: SkipReason::Expired {
                not_after: Utc::now(),
            },
        };
        assert_eq!(outcome.updated(), 0);
        assert_eq!(BindOutcome::Success { updated: 2 }.updated(), 2);
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::NotYetValid {
            not_before: DateTime::from_timestamp(0, 0).unwrap(),
        };
        assert!(reason.to_string().starts_with("certificate is not valid until 1970-01-01"));
    }
}
