//! # roomhubd: roomhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars) and initialise logging
//! - Build the room's devices and the registry that owns them
//! - Connect the MQTT transport and subscribe to the controller topic
//! - Start the command queue, the inbound loop and the change forwarder
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use roomhub_adapter_http_axum::state::AppState;
use roomhub_adapter_mqtt::MqttTransport;
use roomhub_app::command_queue::CommandQueue;
use roomhub_app::event_bus::InProcessEventBus;
use roomhub_app::history::MessageHistory;
use roomhub_app::ports::Transport;
use roomhub_app::registry::DeviceRegistry;
use roomhub_app::router::InboundRouter;
use roomhub_app::runtime::{InboundLoop, spawn_change_forwarder};
use roomhub_domain::layout::build_devices;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Devices
    let room = config.room_id()?;
    let devices = build_devices(room, &config.device_specs())?;
    tracing::info!(%room, devices = devices.len(), "room layout loaded");
    let registry = Arc::new(DeviceRegistry::with_devices(devices));

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));

    // Transport
    let transport = Arc::new(MqttTransport::new(config.mqtt.clone())?);
    let transport_events = transport.connect().await?;
    transport.subscribe(&config.mqtt.subscribe_topic).await?;
    tracing::info!(
        broker = %config.mqtt.broker_host,
        port = config.mqtt.broker_port,
        topic = %config.mqtt.subscribe_topic,
        "controller transport started"
    );

    // Background loops
    let queue = Arc::new(CommandQueue::new(
        Arc::clone(&transport),
        Arc::clone(&event_bus),
        config.queue_config(),
    ));
    let queue_task = queue.start();

    let history = Arc::new(MessageHistory::default());
    let router = InboundRouter::new(
        Arc::clone(&registry),
        Arc::clone(&history),
        Arc::clone(&event_bus),
    );
    let inbound_task = InboundLoop::start(
        room,
        transport_events,
        router,
        Arc::clone(&queue),
        Arc::clone(&event_bus),
    );
    let forwarder_task = spawn_change_forwarder(&registry, Arc::clone(&event_bus));

    // HTTP
    let state = AppState::new(room, registry, queue, history, event_bus);
    let app = roomhub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "roomhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    queue_task.abort();
    inbound_task.abort();
    forwarder_task.abort();
    tracing::info!("roomhubd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
