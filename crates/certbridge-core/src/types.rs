//! Shared data types exchanged between the certificate engine, the binding
//! reconciler and the external collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one issued certificate at the certificate authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificateId {
    pub account_id: u64,
    pub domain_id: u64,
    pub certificate_id: u64,
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.account_id, self.domain_id, self.certificate_id
        )
    }
}

/// PEM-encoded certificates returned by the certificate authority for one
/// issued certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateChain {
    /// The leaf (server) certificate
    pub server: Option<String>,
    /// The root certificate, when the authority returns one
    pub root: Option<String>,
    /// Intermediate certificates, in the order returned
    #[serde(default)]
    pub chain: Vec<String>,
}

/// Opaque handle for a web application managed by the application
/// management collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationTarget {
    /// Fully qualified resource identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Region the application runs in
    pub region: String,
    /// Resource group that owns the application
    pub resource_group: String,
}

impl ApplicationTarget {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region: String::new(),
            resource_group: String::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = resource_group.into();
        self
    }
}

impl fmt::Display for ApplicationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Live state of one hostname on one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostNameBindingSnapshot {
    pub host_name: String,
    /// Thumbprint currently bound, if the application reports one
    pub current_thumbprint: Option<String>,
}

impl HostNameBindingSnapshot {
    pub fn new(host_name: impl Into<String>, current_thumbprint: Option<String>) -> Self {
        Self {
            host_name: host_name.into(),
            current_thumbprint,
        }
    }
}

/// String metadata attached to certificates and blobs.
///
/// Keys keep the casing they were inserted with, but lookups and
/// replacements ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any existing key that differs only in case.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.0.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A stored object with its metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    pub container: String,
    pub name: String,
    pub bytes: Vec<u8>,
    pub metadata: Metadata,
}

impl Blob {
    /// Returns `container/name`.
    pub fn uri(&self) -> String {
        format!("{}/{}", self.container, self.name)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("container", &self.container)
            .field("name", &self.name)
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_lookup_ignores_case() {
        let mut metadata = Metadata::new();
        metadata.insert("CommonName", "site.local");

        assert_eq!(metadata.get("commonname"), Some("site.local"));
        assert_eq!(metadata.get("COMMONNAME"), Some("site.local"));
        assert_eq!(metadata.get("Thumbprint"), None);
    }

    #[test]
    fn test_metadata_insert_replaces_case_insensitive_key() {
        let mut metadata = Metadata::new();
        metadata.insert("commonname", "old");
        metadata.insert("CommonName", "new");

        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("commonName"), Some("new"));
    }

    #[test]
    fn test_blob_debug_hides_bytes() {
        let blob = Blob {
            container: "certificates".to_string(),
            name: "site.privkey.pfx".to_string(),
            bytes: vec![1, 2, 3],
            metadata: Metadata::new(),
        };

        let debug = format!("{:?}", blob);
        assert!(debug.contains("[3 bytes]"));
        assert_eq!(blob.uri(), "certificates/site.privkey.pfx");
    }

    #[test]
    fn test_certificate_id_display() {
        let id = CertificateId {
            account_id: 1,
            domain_id: 2,
            certificate_id: 3,
        };
        assert_eq!(id.to_string(), "1/2/3");
    }
}
