//! Session identity carried in JWT bearer tokens.
//!
//! The hosting application issues HS256 tokens for its sessions; this module
//! validates them into an [`AuthInfo`], the acting identity every add-on sees.
//!
//! This module is database-agnostic: implement `JwtSubject` for your user type.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::AppError;

/// JWT issuer identifier.
const ISSUER: &str = "addons-service";
/// JWT audience identifier.
const AUDIENCE: &str = "addons-service";

/// Trait for types that can be used as JWT subjects.
pub trait JwtSubject {
    /// User's unique identifier.
    fn user_id(&self) -> Uuid;
    /// User's display name.
    fn name(&self) -> &str;
    /// User's role as a string (e.g., "administrator", "user").
    fn role(&self) -> &str;
}

/// User role used for authorization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Administrator,
    User,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Administrator => "administrator",
            Self::User => "user",
        })
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrator" => Ok(Self::Administrator),
            "user" => Ok(Self::User),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// Validated session identity from JWT.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl AuthInfo {
    /// Check if user has admin role.
    #[inline]
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Administrator)
    }

    /// Check if user can act on the target user's records.
    #[inline]
    #[must_use]
    pub fn can_access(&self, target_user_id: Uuid) -> bool {
        self.user_id == target_user_id || self.is_admin()
    }

    /// Require access to target user.
    ///
    /// # Errors
    /// Returns `AppError::PermissionDenied` when acting on another user without admin role.
    pub fn require_access(&self, target: Uuid, action: &str) -> Result<(), AppError> {
        if self.can_access(target) {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, target = %target, action, "Permission denied");
            Err(AppError::PermissionDenied(format!(
                "Cannot {action} for other users"
            )))
        }
    }

    /// Require admin role.
    ///
    /// # Errors
    /// Returns `AppError::PermissionDenied` for non-admin sessions.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("Admin access required".to_string()))
        }
    }
}

/// JWT claims structure following RFC 7519.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub aud: String,
    pub iss: String,
    /// JWT ID (unique token identifier)
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,

    pub role: String,
    pub name: String,
}

/// JWT validation errors.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("invalid authorization format")]
    InvalidFormat,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid claim: {0}")]
    InvalidClaim(&'static str),
}

impl TryFrom<Claims> for AuthInfo {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidClaim("sub"))?,
            role: claims
                .role
                .parse()
                .map_err(|_| JwtError::InvalidClaim("role"))?,
            name: claims.name,
        })
    }
}

/// Pre-compiled JWT validator with cached encoding/decoding keys.
///
/// Thread-safe and cloneable via `Arc`.
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl JwtValidator {
    /// Create a new validator from a secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret_bytes)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret_bytes)),
            validation,
        }
    }

    /// Issue a session token for any type implementing `JwtSubject`.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if encoding fails.
    pub fn generate_session_token<T: JwtSubject>(
        &self,
        subject: &T,
        ttl_minutes: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(ttl_minutes);

        let claims = Claims {
            sub: subject.user_id().to_string(),
            aud: AUDIENCE.to_string(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            role: subject.role().to_string(),
            name: subject.name().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("JWT encoding failed: {e}")))
    }

    /// Validate a JWT and extract the session identity.
    ///
    /// # Errors
    /// Returns `JwtError::InvalidToken` for bad signatures or expired tokens.
    pub fn validate(&self, token: &str) -> Result<AuthInfo, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| JwtError::InvalidToken)?;

        token_data.claims.try_into()
    }
}
