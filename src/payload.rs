//! DNSimple webhook payload and response models.

use certbridge_core::error::PayloadError;
use certbridge_core::types::CertificateId;
use serde::{Deserialize, Serialize};

/// API version of the only supported webhook schema.
pub const SUPPORTED_API_VERSION: &str = "v2";

/// Name of the only event that is processed.
pub const CERTIFICATE_ISSUE_EVENT: &str = "certificate.issue";

/// Inbound webhook body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default, rename = "request_identifier")]
    pub request_id: Option<String>,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default)]
    pub account: Option<WebhookAccount>,

    #[serde(default)]
    pub actor: Option<WebhookActor>,
}

impl WebhookPayload {
    /// Returns true for the single supported version and event combination.
    pub fn is_certificate_issue(&self) -> bool {
        self.api_version.as_deref() == Some(SUPPORTED_API_VERSION)
            && self.name.as_deref() == Some(CERTIFICATE_ISSUE_EVENT)
    }

    /// Like [`is_certificate_issue`](Self::is_certificate_issue), naming the
    /// rejected event.
    pub fn ensure_certificate_issue(&self) -> Result<(), PayloadError> {
        if self.is_certificate_issue() {
            return Ok(());
        }

        Err(PayloadError::UnsupportedEvent {
            name: self.name.clone().unwrap_or_default(),
            api_version: self.api_version.clone().unwrap_or_default(),
        })
    }

    /// Extracts the certificate identifier from `data.certificate` and
    /// `account`.
    ///
    /// # Errors
    ///
    /// [`PayloadError::MissingIdentifier`] if the account, domain or
    /// certificate id is absent or zero, checked in that order.
    pub fn certificate_id(&self) -> Result<CertificateId, PayloadError> {
        let certificate: Option<WebhookCertificate> = self
            .data
            .get("certificate")
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(|e| PayloadError::InvalidJson {
                reason: e.to_string(),
            })?;

        let account_id = self.account.as_ref().map(|a| a.id).unwrap_or_default();
        if account_id == 0 {
            return Err(PayloadError::missing_identifier("account"));
        }

        let certificate = certificate.unwrap_or_default();
        if certificate.domain_id == 0 {
            return Err(PayloadError::missing_identifier("domain"));
        }

        if certificate.id == 0 {
            return Err(PayloadError::missing_identifier("certificate"));
        }

        Ok(CertificateId {
            account_id,
            domain_id: certificate.domain_id,
            certificate_id: certificate.id,
        })
    }
}

/// Certificate object inside the payload's `data`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookCertificate {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub domain_id: u64,

    #[serde(default)]
    pub contact_id: u64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub common_name: Option<String>,

    #[serde(default)]
    pub years: u32,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub auto_renew: bool,

    #[serde(default)]
    pub alternate_names: Vec<String>,

    #[serde(default)]
    pub expires_on: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookAccount {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookActor {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub entity: Option<String>,

    #[serde(default, rename = "pretty")]
    pub display: Option<String>,
}

/// Response returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub message: String,
    pub processed: bool,
    pub status_code: u16,
}
