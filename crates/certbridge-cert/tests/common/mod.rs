//! Shared fixtures for certificate integration tests.
//!
//! The fixtures live in the workspace-level `tests/fixtures` directory. All
//! certificates are valid from 2025-03-04T20:17:07Z to 2026-03-04T20:17:07Z
//! and are signed by `site.key.pem`.

#![allow(dead_code)]

/// Self-signed `CN=site.local` with SANs `site.local` and `martincostello.io`.
pub const SITE_CERT_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/site.cert.pem"
));

/// PKCS#1 RSA-2048 key for every fixture certificate.
pub const SITE_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/site.key.pem"
));

/// Same key, SANs `site.local`, `SITE.LOCAL` and `other.local`.
pub const MIXED_CASE_CERT_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/mixed-case.cert.pem"
));

/// `CN=plain.local` without a SAN extension.
pub const NO_SAN_CERT_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/no-san.cert.pem"
));

/// An unrelated RSA key.
pub const OTHER_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../tests/fixtures/other.key.pem"
));

pub const SITE_THUMBPRINT: &str = "af835520215ccb5b05e0f99e69c804e4d4d9b8dd";
pub const MIXED_CASE_THUMBPRINT: &str = "6dab9b1eb4193d29366ca0bd5ddc075f7e19f12c";
pub const NO_SAN_THUMBPRINT: &str = "90abccb9959c19e3169aff957a7be53fad1f4fd4";
