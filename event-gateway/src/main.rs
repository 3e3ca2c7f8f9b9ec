//! Event Gateway web server.
//!
//! This binary:
//! - Receives signed events on `POST /{server_event}`
//! - Verifies the HMAC-SHA512 signature
//! - Publishes verified events to RabbitMQ
//! - Alerts Slack about forged events and answers 400

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eventgate::signature::CANONICAL_VERSION;
use eventgate::web::router;
use eventgate::{AmqpPublisher, AppState, Config, EventGateway, GatewaySettings, SlackNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Missing secrets abort startup here
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        shared_secret_configured = !config.shared_secret.is_empty(),
        topic = %config.topic_path(),
        slack_channel = %config.slack_channel,
        request_timeout_ms = config.request_timeout_ms,
        canonical_version = CANONICAL_VERSION,
        "config_loaded"
    );

    let publisher = AmqpPublisher::new(config.cloudamqp_url.clone());
    info!("rabbitmq_publisher_created");

    let http = Client::builder()
        .build()
        .context("Failed to create HTTP client")?;
    let notifier = SlackNotifier::new(http, config.slack_api_base.clone(), config.slack_token.clone());

    let gateway = EventGateway::new(
        GatewaySettings {
            secret: config.shared_secret.clone(),
            topic: config.topic_path(),
            alert_channel: config.slack_channel.clone(),
        },
        Arc::new(publisher.clone()),
        Arc::new(notifier),
    );

    let app = router(
        AppState::new(gateway),
        Duration::from_millis(config.request_timeout_ms),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    publisher.close().await;

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
