//! Configuration with validation at startup.

use std::time::Duration;

use addons_core::{OptionStrExt, StrExt};
use addons_db::DbConfig;
use addons_telemetry::{ForwarderConfig, HostVersion, TelemetryConfig};
use clap::Parser;
use secrecy::{ExposeSecret, SecretString};

/// Minimum required JWT secret length for security (256 bits).
const MIN_JWT_SECRET_LEN: usize = 32;

/// Service version reported in health checks and version tags.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Major component of [`VERSION`].
pub const MAJOR_VERSION: &str = env!("CARGO_PKG_VERSION_MAJOR");

/// User-facing validation failures are not forwarded unless configured otherwise.
pub const DEFAULT_IGNORE_EXCEPTIONS: &str = "addons_core::error::AppError::Validation";

/// Add-ons service configuration.
///
/// All values can be set via environment variables or CLI arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "addons-service", about = "ERP add-ons REST service")]
pub struct Config {
    /// Server address
    #[arg(long, env = "HTTP_ADDRESS", default_value = "0.0.0.0:8069")]
    pub http_address: String,

    /// CORS allowed origins (comma-separated, or "*" for any)
    #[arg(long, env = "CORS_ALLOW_ORIGINS")]
    pub cors_allow_origins: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout_secs: u64,

    /// JWT secret key for validating session tokens (min 32 chars)
    #[arg(long, env = "JWT_SECRET_KEY")]
    pub jwt_secret_key: SecretString,

    /// Database connection URL
    #[arg(long, env = "DB_URL")]
    pub db_url: String,

    /// Database password (overrides the one in DB_URL)
    #[arg(long, env = "DB_PASSWORD")]
    pub db_password: Option<String>,

    /// Database pool minimum connections
    #[arg(long, env = "DB_POOL_MIN", default_value = "1")]
    pub db_pool_min: u32,

    /// Database pool maximum connections
    #[arg(long, env = "DB_POOL_MAX", default_value = "10")]
    pub db_pool_max: u32,

    /// Database connection timeout in seconds
    #[arg(long, env = "DB_CONNECT_TIMEOUT", default_value = "5")]
    pub db_connect_timeout_secs: u64,

    /// Apply embedded migrations at startup
    #[arg(long, env = "DB_MIGRATE", default_value = "true")]
    pub db_migrate: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Use JSON log format
    #[arg(long, env = "JSON_LOGS", default_value = "true")]
    pub json_logs: bool,

    /// Forward log records to Sentry
    #[arg(long, env = "SENTRY_ENABLED", default_value = "false")]
    pub sentry_enabled: bool,

    /// Sentry DSN
    #[arg(long, env = "SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    /// Static event tags ("key:value,key:value")
    #[arg(long, env = "SENTRY_TAGS")]
    pub sentry_tags: Option<String>,

    /// Add service version tags to every event
    #[arg(long, env = "SENTRY_INCLUDE_VERSIONS", default_value = "true")]
    pub sentry_include_versions: bool,

    /// Exception type paths that are never forwarded (comma-separated, empty for none)
    #[arg(
        long,
        env = "SENTRY_IGNORE_EXCEPTIONS",
        default_value = DEFAULT_IGNORE_EXCEPTIONS
    )]
    pub sentry_ignore_exceptions: Option<String>,

    /// Lowest level forwarded to Sentry
    #[arg(long, env = "SENTRY_LOGGING_LEVEL", default_value = "warn")]
    pub sentry_logging_level: String,

    /// Environment name (e.g., "production", "staging")
    #[arg(long, env = "SENTRY_ENVIRONMENT")]
    pub sentry_environment: Option<String>,

    /// Release identifier
    #[arg(long, env = "SENTRY_RELEASE")]
    pub sentry_release: Option<String>,

    /// Log target prefixes that are never forwarded (comma-separated)
    #[arg(long, env = "SENTRY_EXCLUDE_LOGGERS")]
    pub sentry_exclude_loggers: Option<String>,
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT secret must be at least {MIN_JWT_SECRET_LEN} characters")]
    JwtSecretTooShort,
    #[error("Database pool max ({max}) must be >= min ({min})")]
    InvalidPoolSize { min: u32, max: u32 },
    #[error("Request timeout must be > 0")]
    InvalidRequestTimeout,
    #[error("Unknown Sentry logging level: {0}")]
    InvalidSentryLevel(String),
    #[error("SENTRY_DSN is required when SENTRY_ENABLED is set")]
    MissingSentryDsn,
}

impl Config {
    /// Parse and validate configuration.
    pub fn init() -> anyhow::Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret_key.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::JwtSecretTooShort);
        }
        if self.db_pool_max < self.db_pool_min {
            return Err(ConfigError::InvalidPoolSize {
                min: self.db_pool_min,
                max: self.db_pool_max,
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        if self
            .sentry_logging_level
            .trim()
            .parse::<tracing::Level>()
            .is_err()
        {
            return Err(ConfigError::InvalidSentryLevel(
                self.sentry_logging_level.clone(),
            ));
        }
        if self.sentry_enabled && self.sentry_dsn.clone().non_empty().is_none() {
            return Err(ConfigError::MissingSentryDsn);
        }
        Ok(())
    }

    /// Get request timeout as Duration.
    #[inline]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Database pool settings.
    pub fn database(&self) -> DbConfig {
        DbConfig::from_url(self.db_url.clone())
            .with_password(self.db_password.clone().non_empty())
            .with_pool(
                self.db_pool_min,
                self.db_pool_max,
                Duration::from_secs(self.db_connect_timeout_secs),
            )
    }

    /// Allowed CORS origins; `None` allows any origin.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let raw = self.cors_allow_origins.as_deref()?.trim();
        if raw == "*" {
            return None;
        }
        Some(raw.split_list())
    }

    /// Logging and error forwarding settings.
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
            forwarder: ForwarderConfig {
                enabled: self.sentry_enabled,
                dsn: self.sentry_dsn.clone().non_empty(),
                tags: self.sentry_tags.clone(),
                include_versions: self.sentry_include_versions,
                ignore_exceptions: self.sentry_ignore_exceptions.clone(),
                logging_level: self.sentry_logging_level.trim().to_string(),
                environment: self.sentry_environment.as_deref().and_then(str::to_opt),
                release: self
                    .sentry_release
                    .clone()
                    .non_empty()
                    .or_else(|| Some(format!("addons-service@{VERSION}"))),
                exclude_loggers: self.sentry_exclude_loggers.clone(),
                host_version: HostVersion::new(VERSION, MAJOR_VERSION),
            },
        }
    }
}
