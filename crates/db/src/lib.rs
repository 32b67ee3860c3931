//! Database layer with SQLx for the add-ons service.
//!
//! Provides:
//! - Connection pool management via [`create_pool`]
//! - Repository pattern for data access via [`Database`]
//! - Embedded schema migrations via [`run_migrations`]
//! - Literal-only saved-filter domains via [`domain`]
//!
//! # Example
//!
//! ```ignore
//! use addons_db::{create_pool, Database, DbConfig};
//!
//! let pool = create_pool(&DbConfig::from_url("postgres://localhost/addons")).await?;
//! let db = Database::new(pool);
//!
//! let filters = db.saved_filters.list_dead_mans_switch().await?;
//! ```

#![expect(clippy::doc_markdown, reason = "SQLx capitalization is intentional")]

pub mod domain;
mod models;
mod repository;

use addons_core::AppError;

/// Database error wrapper for ergonomic error conversion.
///
/// Wraps `sqlx::Error` to enable automatic conversion to `AppError`
/// via the `?` operator throughout repository methods.
#[derive(Debug)]
struct DbError(sqlx::Error);

impl From<sqlx::Error> for DbError {
    #[inline]
    fn from(e: sqlx::Error) -> Self {
        Self(e)
    }
}

impl From<DbError> for AppError {
    #[inline]
    fn from(e: DbError) -> Self {
        Self::Unavailable(e.0.to_string())
    }
}

// =============================================================================
// Public exports - Database models (own their data)
// =============================================================================

pub use models::{Authenticator, SavedFilter, UserIdentity};

// =============================================================================
// Public exports - Parameter types (borrow from caller)
// =============================================================================

pub use models::CreateAuthenticatorParams;

// =============================================================================
// Public exports - Domains
// =============================================================================

pub use domain::{Domain, DomainError, evaluate_domain};

// =============================================================================
// Public exports - Repository and config
// =============================================================================

pub use repository::{
    AuthenticatorRepository, Database, DbConfig, SavedFilterRepository, UserRepository,
    create_pool, run_migrations,
};
