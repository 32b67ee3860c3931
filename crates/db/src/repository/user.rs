//! User repository for read access to the host's `addons.users` and `addons.companies`.

use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::{AppError, DbError, UserIdentity};

/// User repository. Users are owned by the host application and only read here.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a user's display name together with its company's name.
    pub async fn find_identity(&self, user_id: Uuid) -> Result<UserIdentity, AppError> {
        sqlx::query_as::<_, UserIdentity>(
            r"
            SELECT u.id,
                   u.display_name,
                   c.name AS company_display_name
              FROM addons.users u
              JOIN addons.companies c ON c.id = u.company_id
             WHERE u.id = $1
             LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError)?
        .ok_or_else(|| AppError::not_found("User", user_id))
    }
}
