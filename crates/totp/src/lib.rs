//! TOTP capabilities for authenticator provisioning.
//!
//! The provisioning flow never derives codes itself. It talks to two
//! capabilities that can be swapped for test doubles:
//! - [`SecretGenerator`]: fresh random shared secrets
//! - [`TotpProvider`]: `otpauth://` provisioning URIs and code verification
//!
//! [`TotpRs`] implements both on top of the `totp-rs` crate.

use std::time::SystemTimeError;

use addons_core::AppError;
use data_encoding::BASE32_NOPAD;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

/// Shared secret length in bytes (160 bits, the RFC 4226 recommendation).
pub const SECRET_LENGTH: usize = 20;

/// Number of digits in a generated code.
const DIGITS: usize = 6;
/// Code validity step in seconds.
const STEP_SECS: u64 = 30;
/// Accepted clock drift in steps on either side.
const SKEW: u8 = 1;

/// Errors raised by the TOTP backend.
#[derive(Debug, Error)]
pub enum TotpError {
    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(String),

    #[error("system clock error: {0}")]
    Clock(#[from] SystemTimeError),
}

impl From<TotpError> for AppError {
    #[inline]
    fn from(e: TotpError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Source of random shared secrets.
pub trait SecretGenerator: Send + Sync {
    /// Returns a new base32-encoded shared secret.
    fn generate_secret(&self) -> String;
}

/// Provisioning URI builder and code verifier.
pub trait TotpProvider: Send + Sync {
    /// Build the `otpauth://` provisioning URI for `secret`.
    ///
    /// # Errors
    /// Returns an error when the secret or labels are rejected by the backend.
    fn provisioning_uri(
        &self,
        secret: &str,
        account_name: &str,
        issuer: &str,
    ) -> Result<String, TotpError>;

    /// Check `code` against the current time window of `secret`.
    ///
    /// # Errors
    /// Returns an error when the secret is malformed or the clock is unusable.
    fn verify(&self, secret: &str, code: &str) -> Result<bool, TotpError>;
}

/// `totp-rs` backed implementation (SHA1, 6 digits, 30 second step).
#[derive(Debug, Clone, Copy, Default)]
pub struct TotpRs;

impl TotpRs {
    /// Secrets of any length and labels containing `:` are accepted; the
    /// labels are percent-encoded in the provisioning URI.
    fn totp(secret: &str, issuer: Option<String>, account_name: String) -> Result<TOTP, TotpError> {
        let bytes = Secret::Encoded(secret.to_string())
            .to_bytes()
            .map_err(|e| TotpError::InvalidSecret(format!("{e:?}")))?;

        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP_SECS,
            bytes,
            issuer,
            account_name,
        ))
    }
}

impl SecretGenerator for TotpRs {
    fn generate_secret(&self) -> String {
        let mut bytes = [0u8; SECRET_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        BASE32_NOPAD.encode(&bytes)
    }
}

impl TotpProvider for TotpRs {
    fn provisioning_uri(
        &self,
        secret: &str,
        account_name: &str,
        issuer: &str,
    ) -> Result<String, TotpError> {
        let totp = Self::totp(secret, Some(issuer.to_string()), account_name.to_string())?;
        Ok(totp.get_url())
    }

    fn verify(&self, secret: &str, code: &str) -> Result<bool, TotpError> {
        let totp = Self::totp(secret, None, String::new())?;
        Ok(totp.check_current(code)?)
    }
}
