//! Database models and parameter types for the add-ons schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Host user joined with its company, as shown on a provisioning QR code.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub display_name: String,
    pub company_display_name: String,
}

/// Provisioned TOTP authenticator.
///
/// The secret is write-once and never serialized.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Authenticator {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Saved filter with its dead-man's-switch flag.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: Uuid,
    pub name: String,
    pub model_name: String,
    /// Textual literal domain, see [`crate::domain`].
    pub domain: String,
    pub user_id: Option<Uuid>,
    /// Include this filter in the periodic dead-man's-switch check.
    pub is_dead_mans_switch_filter: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Parameter types (borrow from caller)
// =============================================================================

/// Parameters for inserting an authenticator.
#[derive(Debug, Clone, Copy)]
pub struct CreateAuthenticatorParams<'a> {
    pub name: &'a str,
    pub secret_key: &'a str,
    pub user_id: Uuid,
}
