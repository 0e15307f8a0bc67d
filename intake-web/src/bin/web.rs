//! Intake web server.
//!
//! Serves the loan application form, accepts submissions on `/submit` and
//! relays them to the Brevo transactional email API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use intake::{router, AppState, BrevoMailer, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments set the environment directly
    let dotenv = dotenvy::dotenv().ok();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!(dotenv_file = ?dotenv, "web_server_starting");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        sender_email = %config.sender_email,
        receiver_email = %config.receiver_email,
        brevo_api_url = %config.brevo_api_url,
        upload_dir = %config.upload_dir.display(),
        public_dir = %config.public_dir.display(),
        max_body_bytes = config.max_body_bytes,
        "config_loaded"
    );

    let mailer = BrevoMailer::new(&config).context("Failed to create HTTP client")?;

    // Create application state
    let state = AppState::new(config.clone(), Arc::new(mailer));

    state
        .uploads
        .ensure()
        .await
        .with_context(|| format!("Failed to create {}", state.uploads.root().display()))?;

    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
