//! # housebridged — hardware bridge daemon
//!
//! Composition root that wires the adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise logging
//! - Build the topic registry from the default schema and `[[topics]]`
//! - Construct the MQTT transport and spawn its receive loop
//! - Construct the bridge, injecting the transport and the event bus
//! - Build the axum router and serve until SIGINT/SIGTERM
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no bridge logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use housebridge_adapter_http_axum::state::AppState;
use housebridge_adapter_mqtt::MqttTransport;
use housebridge_app::event_bus::InProcessEventBus;
use housebridge_app::services::bridge_service::HardwareBridge;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = config.registry().context("failed to build topic registry")?;
    tracing::info!(mappings = registry.len(), "topic registry ready");

    // Transport
    let (transport, eventloop) = MqttTransport::new(&config.mqtt);

    // Bridge
    let event_bus = Arc::new(InProcessEventBus::new(config.bridge.event_capacity));
    let bridge = Arc::new(HardwareBridge::new(
        transport,
        Arc::clone(&event_bus),
        registry,
        config.coordinator_config(),
    ));
    bridge
        .subscribe_all()
        .await
        .context("failed to queue topic subscriptions")?;

    tracing::info!(
        host = %config.mqtt.broker_host,
        port = config.mqtt.broker_port,
        "connecting to MQTT broker"
    );
    let receiver = tokio::spawn(eventloop.run(bridge.dispatcher()));

    // HTTP
    let app = housebridge_adapter_http_axum::router::build(AppState::new(bridge, event_bus));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("housebridged listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    receiver.abort();
    tracing::info!("housebridged stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
