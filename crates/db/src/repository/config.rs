//! Database configuration and pool creation.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::AppError;

/// Database configuration.
#[derive(Clone)]
#[must_use]
pub struct DbConfig {
    pub url: String,
    /// Overrides any password embedded in `url`.
    pub password: Option<String>,
    pub pool_min: u32,
    pub pool_max: u32,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("pool_min", &self.pool_min)
            .field("pool_max", &self.pool_max)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl DbConfig {
    pub const DEFAULT_POOL_MIN: u32 = 1;
    pub const DEFAULT_POOL_MAX: u32 = 10;
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration from a URL with default pool settings.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the password applied on top of the URL.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Sets pool bounds and acquire timeout.
    pub const fn with_pool(mut self, min: u32, max: u32, connect_timeout: Duration) -> Self {
        self.pool_min = min;
        self.pool_max = max;
        self.connect_timeout = connect_timeout;
        self
    }

    /// Parse the URL and apply the separate password, if any.
    ///
    /// # Errors
    /// Returns `AppError::InvalidArgument` for an unparseable URL.
    pub fn connect_options(&self) -> Result<PgConnectOptions, AppError> {
        let options = PgConnectOptions::from_str(&self.url)
            .map_err(|e| AppError::InvalidArgument(format!("Invalid database URL: {e}")))?;

        Ok(match &self.password {
            Some(password) => options.password(password),
            None => options,
        })
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            password: None,
            pool_min: Self::DEFAULT_POOL_MIN,
            pool_max: Self::DEFAULT_POOL_MAX,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Create database connection pool.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool, AppError> {
    let options = config.connect_options()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min)
        .max_connections(config.pool_max)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await
        .map_err(|e| AppError::Unavailable(format!("Database connection failed: {e}")))?;

    info!(
        pool_min = config.pool_min,
        pool_max = config.pool_max,
        "Database pool created"
    );
    Ok(pool)
}
