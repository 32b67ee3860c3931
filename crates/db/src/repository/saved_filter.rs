//! Saved filter repository for database operations on `addons.saved_filters`.

use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::{AppError, DbError, SavedFilter};

/// Saved filter repository.
#[derive(Debug, Clone)]
pub struct SavedFilterRepository {
    pool: PgPool,
}

impl SavedFilterRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List filters flagged for the dead-man's-switch check.
    pub async fn list_dead_mans_switch(&self) -> Result<Vec<SavedFilter>, AppError> {
        Ok(sqlx::query_as::<_, SavedFilter>(
            r"
            SELECT id, name, model_name, domain, user_id, is_dead_mans_switch_filter, created_at
              FROM addons.saved_filters
             WHERE is_dead_mans_switch_filter
             ORDER BY name, id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError)?)
    }

    /// Set or clear the dead-man's-switch flag, returning the updated filter.
    pub async fn set_dead_mans_switch(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<SavedFilter, AppError> {
        sqlx::query_as::<_, SavedFilter>(
            r"
            UPDATE addons.saved_filters
               SET is_dead_mans_switch_filter = $2
             WHERE id = $1
            RETURNING id, name, model_name, domain, user_id, is_dead_mans_switch_filter, created_at
            ",
        )
        .bind(id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError)?
        .ok_or_else(|| AppError::not_found("Saved filter", id))
    }
}
