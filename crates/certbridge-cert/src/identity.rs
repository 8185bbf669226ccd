//! Identity facts extracted from an X.509 certificate.

use certbridge_core::error::{CertificateError, Result};
use certbridge_core::types::Metadata;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::parse_x509_certificate;
use x509_parser::time::ASN1Time;

/// Date layout used for the `NotBefore` and `NotAfter` metadata values.
pub const METADATA_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Identity of one certificate, extracted once when the certificate is
/// loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateIdentity {
    thumbprint: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject: String,
    issuer: String,
    common_name: String,
    serial_number: String,
    signature_algorithm: String,
    version: u32,
    subject_alternative_names: Vec<String>,
    public_key_info: Vec<u8>,
}

impl CertificateIdentity {
    /// Parses a DER-encoded certificate.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Format`] for empty or malformed input.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        if der.is_empty() {
            return Err(CertificateError::format("Certificate data is empty").into());
        }

        let (_, cert) = parse_x509_certificate(der)
            .map_err(|e| CertificateError::format(format!("Failed to parse certificate: {}", e)))?;

        let validity = cert.validity();
        let subject = cert.subject().to_string();
        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| subject.strip_prefix("CN=").unwrap_or(&subject).to_string());

        let identity = Self {
            thumbprint: thumbprint(der),
            not_before: to_utc(&validity.not_before)?,
            not_after: to_utc(&validity.not_after)?,
            issuer: cert.issuer().to_string(),
            common_name,
            subject,
            serial_number: hex::encode_upper(cert.raw_serial()),
            signature_algorithm: signature_algorithm_name(
                &cert.signature_algorithm.algorithm.to_id_string(),
            ),
            version: cert.version().0 + 1,
            subject_alternative_names: subject_alternative_names_from_rendering(
                &render_subject_alternative_names(&cert)?,
            ),
            public_key_info: cert.tbs_certificate.subject_pki.raw.to_vec(),
        };

        debug!(
            thumbprint = %identity.thumbprint,
            subject = %identity.subject,
            names = identity.subject_alternative_names.len(),
            "Extracted certificate identity"
        );

        Ok(identity)
    }

    /// Lower-case hex SHA-1 of the DER encoding.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Returns `(not_before, not_after)`.
    pub fn validity_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.not_before, self.not_after)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Subject common name without the `CN=` prefix.
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Upper-case hex serial number.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn signature_algorithm(&self) -> &str {
        &self.signature_algorithm
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Lower-cased, de-duplicated Subject Alternative Names in certificate
    /// order. Empty when the extension is absent.
    pub fn subject_alternative_names(&self) -> &[String] {
        &self.subject_alternative_names
    }

    /// DER `SubjectPublicKeyInfo`.
    pub fn public_key_info(&self) -> &[u8] {
        &self.public_key_info
    }

    /// Descriptive metadata stored alongside uploaded certificates.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("FriendlyName", "");
        metadata.insert("Issuer", self.issuer.as_str());
        metadata.insert("IssuerName", self.issuer.as_str());
        metadata.insert(
            "NotAfter",
            self.not_after.format(METADATA_DATE_FORMAT).to_string(),
        );
        metadata.insert(
            "NotBefore",
            self.not_before.format(METADATA_DATE_FORMAT).to_string(),
        );
        metadata.insert("SerialNumber", self.serial_number.as_str());
        metadata.insert("SignatureAlgorithm", self.signature_algorithm.as_str());
        metadata.insert("Subject", self.subject.as_str());
        metadata.insert("SubjectName", self.subject.as_str());
        metadata.insert("Thumbprint", self.thumbprint.to_uppercase());
        metadata.insert("Version", self.version.to_string());
        metadata
    }
}

impl AsRef<CertificateIdentity> for CertificateIdentity {
    fn as_ref(&self) -> &CertificateIdentity {
        self
    }
}

/// Lower-case hex SHA-1 digest of `der`.
pub fn thumbprint(der: &[u8]) -> String {
    hex::encode(Sha1::digest(der))
}

/// Parses a multi-line `Type=value` rendering of a SAN extension into an
/// ordered set of lower-cased names.
///
/// Each line contributes the text after its last `=` or `:`; names already
/// seen are dropped.
pub fn subject_alternative_names_from_rendering(rendering: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for line in rendering.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value = match line.rfind(|c| c == '=' || c == ':') {
            Some(index) => &line[index + 1..],
            None => line,
        };

        let value = value.trim().to_lowercase();
        if !value.is_empty() && !names.contains(&value) {
            names.push(value);
        }
    }

    names
}

fn render_subject_alternative_names(cert: &X509Certificate<'_>) -> Result<String> {
    let extension = cert.subject_alternative_name().map_err(|e| {
        CertificateError::format(format!("Invalid subject alternative name extension: {}", e))
    })?;

    let Some(extension) = extension else {
        return Ok(String::new());
    };

    let lines: Vec<String> = extension
        .value
        .general_names
        .iter()
        .filter_map(render_general_name)
        .collect();

    Ok(lines.join("\n"))
}

fn render_general_name(name: &GeneralName<'_>) -> Option<String> {
    match name {
        GeneralName::DNSName(dns) => Some(format!("DNS Name={}", dns)),
        GeneralName::RFC822Name(email) => Some(format!("RFC822 Name={}", email)),
        GeneralName::URI(uri) => Some(format!("URL={}", uri)),
        GeneralName::IPAddress(bytes) => render_ip_address(bytes),
        GeneralName::RegisteredID(oid) => Some(format!("Registered ID={}", oid.to_id_string())),
        _ => None,
    }
}

fn render_ip_address(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(format!("IP Address={}", Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(format!("IP Address={}", Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or_else(|| {
        CertificateError::format(format!("Certificate time out of range: {}", time)).into()
    })
}

fn signature_algorithm_name(oid: &str) -> String {
    match oid {
        "1.2.840.113549.1.1.5" => "sha1RSA",
        "1.2.840.113549.1.1.11" => "sha256RSA",
        "1.2.840.113549.1.1.12" => "sha384RSA",
        "1.2.840.113549.1.1.13" => "sha512RSA",
        "1.2.840.10045.4.3.2" => "sha256ECDSA",
        "1.2.840.10045.4.3.3" => "sha384ECDSA",
        "1.2.840.10045.4.3.4" => "sha512ECDSA",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering_dedupes_and_lowercases() {
        let rendering = "DNS Name=site.local\nDNS Name=SITE.LOCAL\r\nDNS Name=other.local\n";
        assert_eq!(
            subject_alternative_names_from_rendering(rendering),
            vec!["site.local".to_string(), "other.local".to_string()]
        );
    }

    #[test]
    fn test_rendering_uses_last_delimiter() {
        let rendering = "URL=https://example.com\nRFC822 Name=ops@example.com";
        assert_eq!(
            subject_alternative_names_from_rendering(rendering),
            vec!["//example.com".to_string(), "ops@example.com".to_string()]
        );
    }

    #[test]
    fn test_empty_rendering() {
        assert!(subject_alternative_names_from_rendering("").is_empty());
        assert!(subject_alternative_names_from_rendering("\n\n").is_empty());
    }

    #[test]
    fn test_empty_der_is_format_error() {
        assert!(CertificateIdentity::from_der(&[]).unwrap_err().is_format_error());
        assert!(CertificateIdentity::from_der(&[0x30, 0x03, 0x01])
            .unwrap_err()
            .is_format_error());
    }

    #[test]
    fn test_thumbprint_is_lowercase_sha1() {
        assert_eq!(thumbprint(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_signature_algorithm_names() {
        assert_eq!(signature_algorithm_name("1.2.840.113549.1.1.11"), "sha256RSA");
        assert_eq!(signature_algorithm_name("1.3.101.112"), "1.3.101.112");
    }
}
