//! Fixtures and builders shared by the root integration tests.
//!
//! Every fixture certificate is valid from 2025-03-04T20:17:07Z to
//! 2026-03-04T20:17:07Z and is signed by `site.key.pem`.

#![allow(dead_code)]

use certbridge::naming::{BlobNames, CERTIFICATES_CONTAINER};
use certbridge_cert::{compose_private, export_pfx, FixedClock};
use certbridge_core::types::{ApplicationTarget, Blob, CertificateChain, Metadata};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub const SITE_CERT_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/site.cert.pem"
));

pub const SITE_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/site.key.pem"
));

pub const NO_SAN_CERT_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/no-san.cert.pem"
));

pub const OTHER_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/other.key.pem"
));

/// Thumbprint of `site.cert.pem` (SANs `site.local`, `martincostello.io`).
pub const SITE_THUMBPRINT: &str = "af835520215ccb5b05e0f99e69c804e4d4d9b8dd";

/// Thumbprint of `no-san.cert.pem` (`CN=plain.local`).
pub const NO_SAN_THUMBPRINT: &str = "90abccb9959c19e3169aff957a7be53fad1f4fd4";

pub const PFX_PASSWORD: &str = "Pa55w0rd!";

pub fn not_before() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 4, 20, 17, 7).unwrap()
}

pub fn not_after() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 4, 20, 17, 7).unwrap()
}

/// A clock inside the fixtures' validity window.
pub fn valid_clock() -> FixedClock {
    FixedClock::new(not_before() + Duration::days(30))
}

pub fn application(name: &str) -> ApplicationTarget {
    ApplicationTarget::new(
        format!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/sites/{}", name),
        name,
    )
    .with_region("uksouth")
    .with_resource_group("rg")
}

/// Exports `cert_pem` with the site key as a PKCS#12 blob named the way the
/// webhook pipeline names it.
pub fn pfx_blob(cert_pem: &str, common_name: Option<&str>) -> Blob {
    let handle = compose_private(cert_pem, SITE_KEY_PEM).unwrap();
    let bytes = export_pfx(&handle, PFX_PASSWORD).unwrap();

    let mut metadata = handle.identity().metadata();
    if let Some(common_name) = common_name {
        metadata.insert("CommonName", common_name);
    }

    Blob {
        container: CERTIFICATES_CONTAINER.to_string(),
        name: BlobNames::for_certificate(handle.identity()).private_key_pfx(),
        bytes,
        metadata,
    }
}

pub fn empty_blob() -> Blob {
    Blob {
        container: CERTIFICATES_CONTAINER.to_string(),
        name: "empty.privkey.pfx".to_string(),
        bytes: Vec::new(),
        metadata: Metadata::new(),
    }
}

pub fn site_chain() -> CertificateChain {
    CertificateChain {
        server: Some(SITE_CERT_PEM.to_string()),
        root: Some(NO_SAN_CERT_PEM.to_string()),
        chain: vec![NO_SAN_CERT_PEM.to_string()],
    }
}

/// Body of a `certificate.issue` webhook.
pub fn issue_payload(account_id: u64, domain_id: u64, certificate_id: u64) -> String {
    serde_json::json!({
        "name": "certificate.issue",
        "api_version": "v2",
        "request_identifier": "4e9a8e3b-5d2f-4f6e-9b0c-1c2d3e4f5a6b",
        "data": {
            "certificate": {
                "id": certificate_id,
                "domain_id": domain_id,
                "contact_id": 11,
                "name": "www",
                "common_name": "site.local",
                "years": 1,
                "state": "issued",
                "auto_renew": false,
                "alternate_names": ["martincostello.io"],
                "expires_on": "2026-03-04"
            }
        },
        "account": {
            "id": account_id,
            "identifier": "certbridge",
            "display": "certbridge"
        },
        "actor": {
            "id": "1",
            "entity": "user",
            "pretty": "admin@site.local"
        }
    })
    .to_string()
}
