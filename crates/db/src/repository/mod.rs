//! Database repository layer with connection pooling for the add-ons schema.
//!
//! # Error Handling
//!
//! All repository methods return `Result<T, AppError>` where errors are:
//! - `AppError::Unavailable` - Database connection or query failures
//! - `AppError::NotFound` - Requested entity does not exist

#![expect(
    clippy::missing_errors_doc,
    reason = "error handling documented at module level"
)]

mod authenticator;
mod config;
mod saved_filter;
mod user;

use sqlx::postgres::PgPool;
use tracing::info;

use crate::AppError;

pub use authenticator::AuthenticatorRepository;
pub use config::{DbConfig, create_pool};
pub use saved_filter::SavedFilterRepository;
pub use user::UserRepository;

/// Combined database context.
#[derive(Debug, Clone)]
pub struct Database {
    pub users: UserRepository,
    pub authenticators: AuthenticatorRepository,
    pub saved_filters: SavedFilterRepository,
    pool: PgPool,
}

impl Database {
    /// Creates a new database context with all repositories.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            authenticators: AuthenticatorRepository::new(pool.clone()),
            saved_filters: SavedFilterRepository::new(pool.clone()),
            pool,
        }
    }

    /// Check database health by executing a simple query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

/// Apply the embedded `migrations/` to the database.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Unavailable(format!("Database migration failed: {e}")))?;

    info!("Database migrations applied");
    Ok(())
}
