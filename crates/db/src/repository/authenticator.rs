//! Authenticator repository for database operations on `addons.authenticators`.

use sqlx::postgres::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{AppError, Authenticator, CreateAuthenticatorParams, DbError};

/// Authenticator repository. Rows are inserted once and never updated.
#[derive(Debug, Clone)]
pub struct AuthenticatorRepository {
    pool: PgPool,
}

impl AuthenticatorRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a confirmed authenticator.
    pub async fn create(
        &self,
        params: CreateAuthenticatorParams<'_>,
    ) -> Result<Authenticator, AppError> {
        let authenticator = sqlx::query_as::<_, Authenticator>(
            r"
            INSERT INTO addons.authenticators (id, name, secret_key, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, secret_key, user_id, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(params.name)
        .bind(params.secret_key)
        .bind(params.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError)?;

        info!(authenticator_id = %authenticator.id, user_id = %authenticator.user_id, "Authenticator created");
        Ok(authenticator)
    }

    /// Get authenticator by ID.
    pub async fn get(&self, id: Uuid) -> Result<Authenticator, AppError> {
        sqlx::query_as::<_, Authenticator>(
            r"
            SELECT id, name, secret_key, user_id, created_at
              FROM addons.authenticators
             WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError)?
        .ok_or_else(|| AppError::not_found("Authenticator", id))
    }

    /// List a user's authenticators, oldest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Authenticator>, AppError> {
        Ok(sqlx::query_as::<_, Authenticator>(
            r"
            SELECT id, name, secret_key, user_id, created_at
              FROM addons.authenticators
             WHERE user_id = $1
             ORDER BY created_at, id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError)?)
    }

    /// Delete an authenticator.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM addons.authenticators WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Authenticator", id));
        }

        info!(authenticator_id = %id, "Authenticator deleted");
        Ok(())
    }
}
