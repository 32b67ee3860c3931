//! Logging setup and error-event forwarding.
//!
//! This crate provides the observability stack of the add-ons service:
//! - **Logging**: structured console logs via `tracing-subscriber` (JSON or compact)
//! - **Error forwarding**: a `tracing` layer sending qualifying records to an
//!   error tracker, with static tags, version tags and an exception ignore list
//!
//! # Features
//! - `sentry` (default): Sentry client factory

mod forwarder;
mod layer;
#[cfg(feature = "sentry")]
mod sentry_client;

use std::sync::Arc;
use std::time::Duration;

use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter, ParseError};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use forwarder::{
    ClientFactory, ClientOptions, EventClient, ExceptionInfo, ForwardedEvent, Forwarder,
    ForwarderConfig, ForwarderError, HOST_MAJOR_VERSION_TAG, HOST_VERSION_TAG, HostVersion,
    initialize, parse_tags,
};
pub use layer::ForwardingLayer;
#[cfg(feature = "sentry")]
pub use sentry_client::{SentryClient, SentryClientFactory, parse_dsn};

/// Time allowed for queued error events to be sent on shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Noisy dependency targets capped below the configured level.
const DEFAULT_DIRECTIVES: [&str; 5] = [
    "sqlx::query=warn",
    "tower=info",
    "hyper=info",
    "h2=info",
    "sentry=warn",
];

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: String,
    /// Use JSON log format
    pub json_logs: bool,
    pub forwarder: ForwarderConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            json_logs: true,
            forwarder: ForwarderConfig::default(),
        }
    }
}

/// Telemetry setup errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter directive: {0}")]
    Filter(#[from] ParseError),
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
    #[error("failed to install the tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Active telemetry handles that need graceful shutdown.
#[must_use]
pub struct TelemetryGuard {
    client: Option<Arc<dyn EventClient>>,
}

impl TelemetryGuard {
    /// Whether error forwarding is active.
    #[must_use]
    pub fn is_forwarding(&self) -> bool {
        self.client.is_some()
    }

    /// Flush pending error events.
    pub fn shutdown(self) {
        if let Some(client) = self.client
            && !client.flush(FLUSH_TIMEOUT)
        {
            eprintln!("Failed to flush error events within {FLUSH_TIMEOUT:?}");
        }
    }
}

#[allow(clippy::match_same_arms)]
fn parse_level(level: &str) -> Level {
    match level.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn env_filter(log_level: &str) -> Result<EnvFilter, ParseError> {
    DEFAULT_DIRECTIVES.iter().try_fold(
        EnvFilter::from_default_env().add_directive(parse_level(log_level).into()),
        |filter, directive| Ok(filter.add_directive(directive.parse::<Directive>()?)),
    )
}

/// Setup the logging stack.
///
/// - Console logging (JSON or human-readable), filtered by `log_level` and `RUST_LOG`
/// - Error forwarding (if enabled), filtered by its own threshold
///
/// Returns a guard that should be kept alive for the application lifetime.
/// Call `shutdown()` on the guard to flush pending error events.
///
/// # Errors
/// Returns [`TelemetryError`] for bad filter directives, a forwarder that
/// cannot be built, or when a global subscriber is already installed.
pub fn setup_telemetry<F: ClientFactory>(
    config: &TelemetryConfig,
    factory: &F,
) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = env_filter(&config.log_level)?;

    let fmt_layer = if config.json_logs {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_timer(ChronoLocal::new("%H:%M:%S%.3f".to_string()))
            .compact()
            .boxed()
    };

    let forwarder = initialize(&config.forwarder, factory)?;
    let forwarding_layer = forwarder.as_ref().map(|f| {
        f.layer()
            .with_filter(LevelFilter::from_level(f.threshold()))
    });

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .with(forwarding_layer)
        .try_init()?;

    let client = forwarder.map(|f| {
        tracing::info!(threshold = %f.threshold(), "Error forwarding attached");
        Arc::clone(f.client()) as Arc<dyn EventClient>
    });

    Ok(TelemetryGuard { client })
}
