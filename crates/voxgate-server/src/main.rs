//! Voxgate server - HTTP gateway for voice chat over managed cloud services

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxgate_core::Config;
use voxgate_server::{api, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "voxgate_server=debug,voxgate_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Voxgate server");

    let config = Config::from_env();
    info!(region = %config.region, "configuration loaded");

    let state = AppState::from_config(&config);
    let app = api::create_router(state);

    let host = std::env::var("VOXGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match std::env::var("VOXGATE_PORT") {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid VOXGATE_PORT='{}', falling back to 8080", raw);
                8080
            }
        },
        Err(_) => 8080,
    };
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready. Press Ctrl+C to stop.");
    server.await?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
