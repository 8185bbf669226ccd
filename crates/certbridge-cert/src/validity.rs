//! Certificate validity window checks against an injected clock.

use crate::identity::CertificateIdentity;
use certbridge_core::error::CertificateError;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::warn;

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Checks the certificate's validity window against `clock`.
///
/// Both ends of the window are inclusive.
///
/// # Errors
///
/// [`CertificateError::NotYetValid`] before `not_before`,
/// [`CertificateError::Expired`] after `not_after`.
pub fn check_validity<C>(certificate: &C, clock: &dyn Clock) -> Result<(), CertificateError>
where
    C: AsRef<CertificateIdentity> + ?Sized,
{
    let identity = certificate.as_ref();
    let now = clock.now();

    if now < identity.not_before() {
        return Err(CertificateError::NotYetValid {
            thumbprint: identity.thumbprint().to_string(),
            not_before: identity.not_before(),
        });
    }

    if now > identity.not_after() {
        return Err(CertificateError::Expired {
            thumbprint: identity.thumbprint().to_string(),
            not_after: identity.not_after(),
        });
    }

    Ok(())
}

/// Returns true if the certificate is valid at the clock's current instant.
/// Rejections are logged.
pub fn is_valid_now<C>(certificate: &C, clock: &dyn Clock) -> bool
where
    C: AsRef<CertificateIdentity> + ?Sized,
{
    match check_validity(certificate, clock) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Certificate is outside its validity window");
            false
        }
    }
}
