//! Combines public certificates with RSA private keys and exports them as
//! password-protected PKCS#12 archives.

use crate::identity::CertificateIdentity;
use crate::pem::{decode_certificates_pem, decode_rsa_private_key_pem};
use crate::pkcs1::{decode_rsa_private_key_der, RsaKeyParameters};
use certbridge_core::error::{CertificateError, Result};
use p12::PFX;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// A parsed certificate, optionally carrying its private key.
#[derive(Clone)]
pub struct CertificateHandle {
    der: Vec<u8>,
    identity: CertificateIdentity,
    private_key: Option<RsaPrivateKey>,
}

impl CertificateHandle {
    /// Loads a certificate without a private key from DER bytes.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        let identity = CertificateIdentity::from_der(&der)?;
        Ok(Self {
            der,
            identity,
            private_key: None,
        })
    }

    /// Loads a certificate and its private key from a PKCS#12 archive.
    ///
    /// The first certificate bag is the certificate and the first key bag,
    /// if any, its private key.
    ///
    /// # Errors
    ///
    /// [`CertificateError::Format`] if the archive is empty, malformed or
    /// cannot be opened with `password`.
    pub fn from_pfx(bytes: &[u8], password: &str) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CertificateError::format("PKCS#12 data is empty").into());
        }

        let pfx = PFX::parse(bytes)
            .map_err(|e| CertificateError::format(format!("Failed to parse PKCS#12: {:?}", e)))?;

        if !pfx.verify_mac(password) {
            return Err(CertificateError::format("PKCS#12 integrity check failed").into());
        }

        let der = pfx
            .cert_x509_bags(password)
            .map_err(|e| {
                CertificateError::format(format!("Failed to read PKCS#12 certificates: {:?}", e))
            })?
            .into_iter()
            .next()
            .ok_or_else(|| CertificateError::format("PKCS#12 archive contains no certificate"))?;

        let key_bags = pfx
            .key_bags(password)
            .map_err(|e| CertificateError::format(format!("Failed to read PKCS#12 keys: {:?}", e)))?;

        let handle = Self::from_der(der)?;
        match key_bags.into_iter().next().map(Zeroizing::new) {
            Some(key_der) => {
                let key = RsaPrivateKey::from_pkcs8_der(&key_der).map_err(|e| {
                    CertificateError::format(format!("Invalid PKCS#12 private key: {}", e))
                })?;
                handle.with_private_key(key)
            }
            None => Ok(handle),
        }
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn identity(&self) -> &CertificateIdentity {
        &self.identity
    }

    /// Lower-case hex thumbprint.
    pub fn thumbprint(&self) -> &str {
        self.identity.thumbprint()
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    /// Attaches `key` after checking it belongs to this certificate.
    ///
    /// # Errors
    ///
    /// [`CertificateError::KeyMismatch`] if the certificate's public key is
    /// not RSA or differs from `key`.
    pub fn with_private_key(mut self, key: RsaPrivateKey) -> Result<Self> {
        let public = RsaPublicKey::from_public_key_der(self.identity.public_key_info())
            .map_err(|_| CertificateError::KeyMismatch)?;

        if public.n() != key.n() || public.e() != key.e() {
            return Err(CertificateError::KeyMismatch.into());
        }

        self.private_key = Some(key);
        Ok(self)
    }
}

impl AsRef<CertificateIdentity> for CertificateHandle {
    fn as_ref(&self) -> &CertificateIdentity {
        &self.identity
    }
}

impl fmt::Debug for CertificateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateHandle")
            .field("thumbprint", &self.identity.thumbprint())
            .field("subject", &self.identity.subject())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}

/// Zeroes the borrowed parameters when dropped.
struct ClearOnExit<'a>(&'a mut RsaKeyParameters);

impl Drop for ClearOnExit<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Builds a certificate from `public_pem` carrying the RSA key in
/// `private_key_pem` (a PKCS#1 `RSA PRIVATE KEY` block).
///
/// The decoded DER and the intermediate key parameters are zeroed before
/// this returns, whether or not composition succeeds.
pub fn compose_private(public_pem: &str, private_key_pem: &str) -> Result<CertificateHandle> {
    let der = decode_rsa_private_key_pem(private_key_pem)?;
    let mut parameters = decode_rsa_private_key_der(&der)?;
    compose_with_parameters(public_pem, &mut parameters)
}

/// Builds a certificate from `public_pem` carrying the key described by
/// `parameters`.
///
/// Every byte of `parameters` is zero when this returns, on success and on
/// every error path. Buffer lengths are kept.
pub fn compose_with_parameters(
    public_pem: &str,
    parameters: &mut RsaKeyParameters,
) -> Result<CertificateHandle> {
    let key = {
        let guard = ClearOnExit(parameters);
        guard.0.to_private_key()?
    };

    let handle = create_public_only(public_pem)?;
    let handle = handle.with_private_key(key)?;

    info!(
        thumbprint = %handle.thumbprint(),
        subject = %handle.identity().subject(),
        "Composed certificate with private key"
    );

    Ok(handle)
}

/// Builds a certificate without a private key from the first `CERTIFICATE`
/// block of `public_pem`.
pub fn create_public_only(public_pem: &str) -> Result<CertificateHandle> {
    let der = decode_certificates_pem(public_pem.as_bytes())?
        .into_iter()
        .next()
        .ok_or_else(|| CertificateError::format("No certificates found in PEM data"))?;

    CertificateHandle::from_der(der)
}

/// Serializes the certificate and its private key into a PKCS#12 archive
/// protected by `password`.
///
/// # Errors
///
/// [`CertificateError::Export`] if the handle has no private key.
pub fn export_pfx(handle: &CertificateHandle, password: &str) -> Result<Vec<u8>> {
    let key = handle
        .private_key()
        .ok_or_else(|| CertificateError::export("Certificate has no private key"))?;

    let key_der = key
        .to_pkcs8_der()
        .map_err(|e| CertificateError::export(format!("Failed to encode private key: {}", e)))?;

    let pfx = PFX::new(
        handle.der(),
        key_der.as_bytes(),
        None,
        password,
        handle.identity().common_name(),
    )
    .ok_or_else(|| CertificateError::export("Failed to build PKCS#12 archive"))?;

    let bytes = pfx.to_der();
    debug!(
        thumbprint = %handle.thumbprint(),
        bytes = bytes.len(),
        "Exported certificate as PKCS#12"
    );

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_cleared_when_key_is_invalid() {
        let mut der = vec![0x30, 0x81, 0x1b, 0x02, 0x01, 0x00];
        for value in 1u8..=8 {
            der.extend_from_slice(&[0x02, 0x01, value]);
        }
        let mut parameters = decode_rsa_private_key_der(&der).unwrap();

        let result = compose_with_parameters("", &mut parameters);

        assert!(result.is_err());
        assert!(parameters.is_cleared());
    }

    #[test]
    fn test_create_public_only_rejects_non_pem() {
        let err = create_public_only("garbage").unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_from_pfx_rejects_empty_input() {
        let err = CertificateHandle::from_pfx(&[], "password").unwrap_err();
        assert!(err.is_format_error());
    }
}
