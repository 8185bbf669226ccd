//! Webhook processing from payload to stored blobs.

mod common;

use certbridge::{BindOutcome, CertificateBinder, WebhookProcessor};
use certbridge_cert::CertificateHandle;
use certbridge_client::memory::{InMemoryAppServiceClient, InMemoryBlobStore, InMemoryCertificateSource};
use certbridge_client::FileSystemBlobStore;
use certbridge_core::types::CertificateId;
use common::*;
use std::sync::Arc;
use tempfile::TempDir;

const REQUEST_ID: &str = "4e9a8e3b-5d2f-4f6e-9b0c-1c2d3e4f5a6b";
const PREFIX: &str = "site-local_af835520215ccb5b05e0f99e69c804e4d4d9b8dd_2025-03-04";

fn certificate_id() -> CertificateId {
    CertificateId {
        account_id: 1,
        domain_id: 2,
        certificate_id: 3,
    }
}

fn source() -> Arc<InMemoryCertificateSource> {
    let source = InMemoryCertificateSource::new();
    source.insert(certificate_id(), site_chain(), SITE_KEY_PEM);
    Arc::new(source)
}

#[tokio::test]
async fn test_issue_event_uploads_all_blobs_in_order() {
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, source(), store.clone());

    let result = processor.process(&issue_payload(1, 2, 3)).await;

    assert_eq!(result.status_code, 200);
    assert!(result.processed);
    assert_eq!(result.request_id.as_deref(), Some(REQUEST_ID));
    assert_eq!(result.message, format!("Webhook '{}' acknowledged.", REQUEST_ID));

    let expected: Vec<String> = ["chain.pem", "cert.pem", "root.pem", "privkey.pem", "privkey.pfx"]
        .iter()
        .map(|suffix| format!("{}.{}", PREFIX, suffix))
        .collect();
    assert_eq!(store.upload_order(), expected);

    let cert = store
        .get("certificates", &format!("{}.cert.pem", PREFIX))
        .unwrap();
    assert_eq!(cert.bytes, SITE_CERT_PEM.as_bytes());
    assert_eq!(cert.metadata.get("CommonName"), Some("site.local"));
    assert_eq!(
        cert.metadata.get("Thumbprint"),
        Some(SITE_THUMBPRINT.to_uppercase().as_str())
    );
    assert_eq!(cert.metadata.get("FriendlyName"), Some(""));

    let key = store
        .get("certificates", &format!("{}.privkey.pem", PREFIX))
        .unwrap();
    assert_eq!(key.bytes, SITE_KEY_PEM.as_bytes());
}

#[tokio::test]
async fn test_exported_archive_imports_with_password() {
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, source(), store.clone());

    assert!(processor.process(&issue_payload(1, 2, 3)).await.processed);

    let pfx = store
        .get("certificates", &format!("{}.privkey.pfx", PREFIX))
        .unwrap();
    let handle = CertificateHandle::from_pfx(&pfx.bytes, PFX_PASSWORD).unwrap();

    assert_eq!(handle.thumbprint(), SITE_THUMBPRINT);
    assert!(handle.has_private_key());
    assert!(CertificateHandle::from_pfx(&pfx.bytes, "wrong").is_err());
}

#[tokio::test]
async fn test_several_chain_certificates_are_numbered() {
    let source = InMemoryCertificateSource::new();
    let mut chain = site_chain();
    chain.chain.push(NO_SAN_CERT_PEM.to_string());
    chain.root = None;
    source.insert(certificate_id(), chain, SITE_KEY_PEM);

    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, Arc::new(source), store.clone());

    let result = processor.process(&issue_payload(1, 2, 3)).await;
    assert!(result.processed);

    let order = store.upload_order();
    assert_eq!(order.len(), 5);
    assert_eq!(order[0], format!("{}.chain.0.pem", PREFIX));
    assert_eq!(order[1], format!("{}.chain.1.pem", PREFIX));
    assert!(!order.iter().any(|name| name.ends_with(".root.pem")));
}

#[tokio::test]
async fn test_null_and_malformed_bodies_are_bad_requests() {
    let source = source();
    let processor = WebhookProcessor::new(PFX_PASSWORD, source.clone(), Arc::new(InMemoryBlobStore::new()));

    for body in ["null", "{not json", ""] {
        let result = processor.process(body).await;
        assert_eq!(result.status_code, 400, "body {:?}", body);
        assert_eq!(result.message, "Bad request.");
        assert!(!result.processed);
        assert_eq!(result.request_id, None);
    }

    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn test_unsupported_event_is_acknowledged_only() {
    let source = source();
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, source.clone(), store.clone());

    let body = issue_payload(1, 2, 3).replace("certificate.issue", "certificate.remove_from_domain");
    let result = processor.process(&body).await;

    assert_eq!(result.status_code, 200);
    assert!(!result.processed);
    assert_eq!(result.message, format!("Webhook '{}' acknowledged.", REQUEST_ID));
    assert_eq!(source.call_count(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_missing_identifiers_fail_before_fetching() {
    let source = source();
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, source.clone(), store.clone());

    for body in [issue_payload(0, 2, 3), issue_payload(1, 0, 3), issue_payload(1, 2, 0)] {
        let result = processor.process(&body).await;
        assert_eq!(result.status_code, 500);
        assert_eq!(result.message, "Internal server error.");
        assert_eq!(result.request_id.as_deref(), Some(REQUEST_ID));
        assert!(!result.processed);
    }

    assert_eq!(source.call_count(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unknown_certificate_is_an_internal_error() {
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, source(), store.clone());

    let result = processor.process(&issue_payload(1, 2, 99)).await;

    assert_eq!(result.status_code, 500);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_mismatched_key_uploads_nothing() {
    let source = InMemoryCertificateSource::new();
    source.insert(certificate_id(), site_chain(), OTHER_KEY_PEM);
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, Arc::new(source), store.clone());

    let result = processor.process(&issue_payload(1, 2, 3)).await;

    assert_eq!(result.status_code, 500);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_file_system_store_receives_blobs() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileSystemBlobStore::new(dir.path()));
    let processor = WebhookProcessor::new(PFX_PASSWORD, source(), store).with_container("issued");

    let result = processor.process(&issue_payload(1, 2, 3)).await;
    assert!(result.processed);

    let container = dir.path().join("issued");
    assert!(container.join(format!("{}.privkey.pfx", PREFIX)).exists());
    assert!(container
        .join(format!("{}.cert.pem.metadata.json", PREFIX))
        .exists());
}

#[tokio::test]
async fn test_issued_certificate_is_bound() {
    let store = Arc::new(InMemoryBlobStore::new());
    let processor = WebhookProcessor::new(PFX_PASSWORD, source(), store.clone());
    assert!(processor.process(&issue_payload(1, 2, 3)).await.processed);

    let client = Arc::new(
        InMemoryAppServiceClient::new()
            .with_application(application("site-east-us"), [("site.local", Some("old"))])
            .with_application(
                application("site-uk-south"),
                [("martincostello.io", Some("old"))],
            ),
    );
    let binder = CertificateBinder::new(PFX_PASSWORD, client.clone(), Arc::new(valid_clock()));

    let outcome = binder
        .bind_from_store(
            store.as_ref(),
            processor.container(),
            &format!("{}.privkey.pfx", PREFIX),
        )
        .await
        .unwrap();

    assert_eq!(outcome, BindOutcome::Success { updated: 2 });
}

#[tokio::test]
async fn test_components_from_config() {
    let dir = TempDir::new().unwrap();
    let yaml = format!(
        r#"
certificates:
  password: "{}"
dnsimple:
  token: dnsimple-token
app_service:
  subscription_id: 00000000-0000-0000-0000-000000000000
  access_token: arm-token
storage:
  root: "{}"
binder:
  max_concurrent_applications: 3
"#,
        PFX_PASSWORD,
        dir.path().display()
    );
    let config = certbridge::AppConfig::from_yaml(&yaml).unwrap();
    config.validate().unwrap();

    let processor = WebhookProcessor::from_config(&config).unwrap();
    assert_eq!(processor.container(), "certificates");
    assert!(!format!("{:?}", processor).contains(PFX_PASSWORD));

    let binder = CertificateBinder::from_config(&config).unwrap();
    assert_eq!(binder.options().max_concurrent_applications, 3);
}
