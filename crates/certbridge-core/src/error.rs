//! Error types for certbridge.
//!
//! Every failure mode in the system maps onto [`CertBridgeError`]. All variants
//! are serializable so they can be attached to webhook responses and
//! structured log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias using CertBridgeError as the error type.
pub type Result<T> = std::result::Result<T, CertBridgeError>;

/// Top-level error type for all certbridge operations.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum CertBridgeError {
    /// Certificate and key material errors
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    /// Inbound event payload errors
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// External collaborator errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl CertBridgeError {
    /// Returns true if this error means the input bytes or text were malformed.
    pub fn is_format_error(&self) -> bool {
        matches!(self, CertBridgeError::Certificate(e) if e.is_format_error())
    }
}

/// Errors raised while decoding, composing, exporting or validating
/// certificate material.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum CertificateError {
    /// Malformed PEM, DER or PKCS#12 structure
    #[error("Invalid certificate format: {reason}")]
    Format { reason: String },

    /// The outer SEQUENCE of a PKCS#1 key uses an unsupported encoding
    #[error("Invalid private key format: unexpected prefix {prefix}")]
    UnsupportedKeyFormat { prefix: String },

    /// The PKCS#1 version field is not a one-byte INTEGER
    #[error("Invalid private key version: unexpected marker {marker}")]
    UnsupportedKeyVersion { marker: String },

    /// The PKCS#1 version number is not zero (two-prime key)
    #[error("Invalid private key padding: unexpected version {value:#04x}")]
    InvalidKeyPadding { value: u8 },

    /// The certificate could not be exported
    #[error("Failed to export certificate: {reason}")]
    Export { reason: String },

    /// Private key does not belong to the certificate
    #[error("Certificate and private key do not match")]
    KeyMismatch,

    /// Certificate is not valid until a later instant
    #[error("Certificate {thumbprint} is not valid until {not_before}")]
    NotYetValid {
        thumbprint: String,
        not_before: DateTime<Utc>,
    },

    /// Certificate validity window has ended
    #[error("Certificate {thumbprint} expired at {not_after}")]
    Expired {
        thumbprint: String,
        not_after: DateTime<Utc>,
    },
}

impl CertificateError {
    /// Creates a format error.
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Creates an export error.
    pub fn export(reason: impl Into<String>) -> Self {
        Self::Export {
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by malformed PEM/DER/key structure.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CertificateError::Format { .. }
                | CertificateError::UnsupportedKeyFormat { .. }
                | CertificateError::UnsupportedKeyVersion { .. }
                | CertificateError::InvalidKeyPadding { .. }
        )
    }
}

/// Errors related to inbound certificate event payloads.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum PayloadError {
    /// The payload body is not valid JSON for the event schema
    #[error("Invalid payload JSON: {reason}")]
    InvalidJson { reason: String },

    /// A required identifier is absent or zero
    #[error("Failed to deserialize the {field} Id from the payload")]
    MissingIdentifier { field: String },

    /// The event name or schema version is not the supported combination
    #[error("Unsupported event '{name}' for API version '{api_version}'")]
    UnsupportedEvent { name: String, api_version: String },
}

impl PayloadError {
    /// Creates a missing identifier error.
    pub fn missing_identifier(field: impl Into<String>) -> Self {
        Self::MissingIdentifier {
            field: field.into(),
        }
    }
}

/// Errors raised by the external collaborators (certificate authority,
/// management API, object storage).
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ClientError {
    /// The request could not be sent or the connection failed
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The remote service answered with a non-success status
    #[error("Request to {url} failed with status {status}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded
    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Blob does not exist
    #[error("Blob not found: {container}/{name}")]
    BlobNotFound { container: String, name: String },

    /// Caller supplied an argument the collaborator cannot accept
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl ClientError {
    /// Creates a request failed error.
    pub fn request_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Missing required configuration field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Wrapper for I/O errors to make them serializable.
#[derive(Debug, Error, Serialize, Deserialize)]
#[error("I/O error: {kind:?}: {message}")]
pub struct IoError {
    pub kind: IoErrorKind,
    pub message: String,
}

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for CertBridgeError {
    fn from(err: io::Error) -> Self {
        CertBridgeError::Io(err.into())
    }
}

/// Serializable subset of std::io::ErrorKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    InvalidInput,
    InvalidData,
    UnexpectedEof,
    Other,
}

impl From<io::ErrorKind> for IoErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => IoErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => IoErrorKind::AlreadyExists,
            io::ErrorKind::InvalidInput => IoErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => IoErrorKind::InvalidData,
            io::ErrorKind::UnexpectedEof => IoErrorKind::UnexpectedEof,
            _ => IoErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_classification() {
        let err: CertBridgeError = CertificateError::InvalidKeyPadding { value: 1 }.into();
        assert!(err.is_format_error());

        let err: CertBridgeError = CertificateError::export("no private key").into();
        assert!(!err.is_format_error());
    }

    #[test]
    fn test_expired_is_not_a_format_error() {
        let err = CertificateError::Expired {
            thumbprint: "abc".to_string(),
            not_after: Utc::now(),
        };
        assert!(!err.is_format_error());
    }

    #[test]
    fn test_error_serialization() {
        let err = CertBridgeError::Payload(PayloadError::missing_identifier("account"));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Payload"));
        assert!(json.contains("account"));
    }

    #[test]
    fn test_missing_identifier_message() {
        let err = PayloadError::missing_identifier("domain");
        assert_eq!(
            err.to_string(),
            "Failed to deserialize the domain Id from the payload"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CertBridgeError = io_err.into();
        assert!(matches!(
            err,
            CertBridgeError::Io(IoError {
                kind: IoErrorKind::NotFound,
                ..
            })
        ));
    }
}
