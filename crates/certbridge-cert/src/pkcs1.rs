//! PKCS#1 `RSAPrivateKey` DER decoding.
//!
//! Only the two-prime layout is supported:
//!
//! ```text
//! RSAPrivateKey ::= SEQUENCE {
//!     version           INTEGER,  -- 0
//!     modulus           INTEGER,
//!     publicExponent    INTEGER,
//!     privateExponent   INTEGER,
//!     prime1            INTEGER,
//!     prime2            INTEGER,
//!     exponent1         INTEGER,
//!     exponent2         INTEGER,
//!     coefficient       INTEGER
//! }
//! ```

use certbridge_core::error::{CertificateError, Result};
use rsa::{BigUint, RsaPrivateKey};
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SEQUENCE_SHORT_FORM: u16 = 0x3081;
const SEQUENCE_LONG_FORM: u16 = 0x3082;
const VERSION_MARKER: u16 = 0x0201;
const TWO_PRIME_VERSION: u8 = 0x00;
const INTEGER_TAG: u8 = 0x02;

/// The eight numeric components of an RSA private key, each as a big-endian
/// unsigned byte buffer.
///
/// Buffers are zeroized on drop. [`RsaKeyParameters::clear`] zeroes them in
/// place earlier, keeping their lengths.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct RsaKeyParameters {
    modulus: Vec<u8>,
    public_exponent: Vec<u8>,
    private_exponent: Vec<u8>,
    prime_p: Vec<u8>,
    prime_q: Vec<u8>,
    exponent_dp: Vec<u8>,
    exponent_dq: Vec<u8>,
    coefficient_inverse_q: Vec<u8>,
}

impl RsaKeyParameters {
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn public_exponent(&self) -> &[u8] {
        &self.public_exponent
    }

    pub fn private_exponent(&self) -> &[u8] {
        &self.private_exponent
    }

    pub fn prime_p(&self) -> &[u8] {
        &self.prime_p
    }

    pub fn prime_q(&self) -> &[u8] {
        &self.prime_q
    }

    pub fn exponent_dp(&self) -> &[u8] {
        &self.exponent_dp
    }

    pub fn exponent_dq(&self) -> &[u8] {
        &self.exponent_dq
    }

    pub fn coefficient_inverse_q(&self) -> &[u8] {
        &self.coefficient_inverse_q
    }

    /// All eight buffers in DER field order.
    pub fn fields(&self) -> [&[u8]; 8] {
        [
            &self.modulus,
            &self.public_exponent,
            &self.private_exponent,
            &self.prime_p,
            &self.prime_q,
            &self.exponent_dp,
            &self.exponent_dq,
            &self.coefficient_inverse_q,
        ]
    }

    /// Overwrites every byte of every buffer with zero.
    pub fn clear(&mut self) {
        self.modulus.as_mut_slice().zeroize();
        self.public_exponent.as_mut_slice().zeroize();
        self.private_exponent.as_mut_slice().zeroize();
        self.prime_p.as_mut_slice().zeroize();
        self.prime_q.as_mut_slice().zeroize();
        self.exponent_dp.as_mut_slice().zeroize();
        self.exponent_dq.as_mut_slice().zeroize();
        self.coefficient_inverse_q.as_mut_slice().zeroize();
    }

    /// Returns true if every byte of every buffer is zero.
    pub fn is_cleared(&self) -> bool {
        self.fields()
            .iter()
            .all(|field| field.iter().all(|byte| *byte == 0))
    }

    /// Builds an RSA private key from the modulus, exponents and primes.
    ///
    /// The CRT values are recomputed by the key object and checked by
    /// [`RsaPrivateKey::validate`].
    pub fn to_private_key(&self) -> Result<RsaPrivateKey> {
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from_bytes_be(&self.public_exponent),
            BigUint::from_bytes_be(&self.private_exponent),
            vec![
                BigUint::from_bytes_be(&self.prime_p),
                BigUint::from_bytes_be(&self.prime_q),
            ],
        )
        .map_err(|e| CertificateError::format(format!("Invalid RSA key components: {}", e)))?;

        key.validate()
            .map_err(|e| CertificateError::format(format!("Inconsistent RSA key: {}", e)))?;

        Ok(key)
    }
}

impl fmt::Debug for RsaKeyParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyParameters")
            .field("modulus_bits", &(self.modulus.len() * 8))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Decodes a DER-encoded PKCS#1 RSA private key.
///
/// Leading zero bytes of each INTEGER are stripped, so every returned buffer
/// starts at its first significant byte.
///
/// # Errors
///
/// - [`CertificateError::UnsupportedKeyFormat`] if the outer SEQUENCE is not
///   `30 81` or `30 82`
/// - [`CertificateError::UnsupportedKeyVersion`] if the version is not a
///   one-byte INTEGER
/// - [`CertificateError::InvalidKeyPadding`] if the version is not zero
/// - [`CertificateError::Format`] for a missing INTEGER tag, an empty field
///   or truncated input
pub fn decode_rsa_private_key_der(der: &[u8]) -> Result<RsaKeyParameters> {
    let mut reader = DerReader::new(der);

    match reader.read_u16()? {
        SEQUENCE_SHORT_FORM => {
            reader.read_u8()?;
        }
        SEQUENCE_LONG_FORM => {
            reader.read_bytes(2)?;
        }
        prefix => {
            return Err(CertificateError::UnsupportedKeyFormat {
                prefix: format!("{:#06x}", prefix),
            }
            .into())
        }
    }

    let marker = reader.read_u16()?;
    if marker != VERSION_MARKER {
        return Err(CertificateError::UnsupportedKeyVersion {
            marker: format!("{:#06x}", marker),
        }
        .into());
    }

    let version = reader.read_u8()?;
    if version != TWO_PRIME_VERSION {
        return Err(CertificateError::InvalidKeyPadding { value: version }.into());
    }

    // Each field is owned by the zeroizing struct as soon as it is read, so
    // an early return wipes the fields decoded so far.
    let mut parameters = RsaKeyParameters::default();
    parameters.modulus = reader.read_integer("modulus")?;
    parameters.public_exponent = reader.read_integer("public exponent")?;
    parameters.private_exponent = reader.read_integer("private exponent")?;
    parameters.prime_p = reader.read_integer("prime P")?;
    parameters.prime_q = reader.read_integer("prime Q")?;
    parameters.exponent_dp = reader.read_integer("exponent DP")?;
    parameters.exponent_dq = reader.read_integer("exponent DQ")?;
    parameters.coefficient_inverse_q = reader.read_integer("coefficient InverseQ")?;

    debug!(
        modulus_bits = parameters.modulus.len() * 8,
        "Decoded PKCS#1 RSA private key"
    );

    Ok(parameters)
}

/// Forward-only cursor over DER bytes.
struct DerReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> DerReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn truncated(&self) -> CertificateError {
        CertificateError::format(format!(
            "Unexpected end of key data at offset {}",
            self.position
        ))
    }

    fn peek_u8(&self) -> Result<u8> {
        self.bytes
            .get(self.position)
            .copied()
            .ok_or_else(|| self.truncated().into())
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.truncated())?;
        let bytes = &self.bytes[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Reads the length octets of a DER element.
    fn read_length(&mut self) -> Result<usize> {
        let length = match self.read_u8()? {
            0x81 => self.read_u8()? as u32,
            0x82 => {
                let high = self.read_u8()?;
                let low = self.read_u8()?;
                u32::from_le_bytes([low, high, 0, 0])
            }
            short => short as u32,
        };
        Ok(length as usize)
    }

    /// Reads one INTEGER, dropping its leading zero padding.
    fn read_integer(&mut self, field: &str) -> Result<Vec<u8>> {
        let tag = self.read_u8()?;
        if tag != INTEGER_TAG {
            return Err(CertificateError::format(format!(
                "Expected INTEGER tag for {}, found {:#04x}",
                field, tag
            ))
            .into());
        }

        let mut length = self.read_length()?;
        while length > 0 && self.peek_u8()? == 0x00 {
            self.position += 1;
            length -= 1;
        }

        if length == 0 {
            return Err(CertificateError::format(format!("RSA {} is empty", field)).into());
        }

        Ok(self.read_bytes(length)?.to_vec())
    }
}
