//! Add-ons service: TOTP provisioning, dead-man's-switch filters, error forwarding.

use addons_service::config::{Config, VERSION};
use addons_service::startup::build_app;
use addons_telemetry::{SentryClientFactory, setup_telemetry};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init()?;
    let telemetry = setup_telemetry(&config.telemetry(), &SentryClientFactory)?;

    info!(
        version = VERSION,
        address = %config.http_address,
        error_forwarding = telemetry.is_forwarding(),
        pid = std::process::id(),
        "Starting addons-service"
    );

    let (app, addr) = build_app(&config).await?;

    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = &served {
        error!(error = %e, "Server error");
    }

    info!("Shutdown complete");
    telemetry.shutdown();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
