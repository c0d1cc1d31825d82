//! # skyshedd — skyshed observatory daemon
//!
//! Composition root that wires the automation engine to hardware adapters
//! and runs an observation session.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Construct hardware adapters (currently the virtual observatory)
//! - Construct the automation engine, injecting adapters via port traits
//! - Run the startup sequence and keep the session alive
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no automation logic belongs here.

mod config;

use std::sync::Arc;

use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing_subscriber::EnvFilter;

use skyshed_adapter_virtual::VirtualObservatory;
use skyshed_app::engine::AutomationEngine;
use skyshed_app::event_bus::InProcessEventBus;
use skyshed_app::ports::AlwaysVisible;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let event_bus = InProcessEventBus::new(256);
    spawn_event_logger(&event_bus);

    let observatory = VirtualObservatory::default();
    let engine = AutomationEngine::new(
        Arc::clone(&observatory.mount),
        Arc::clone(&observatory.dome),
        Arc::clone(&observatory.weather),
        Arc::clone(&observatory.imaging),
        Arc::new(AlwaysVisible),
        event_bus,
        config.engine_settings()?,
    );

    if !engine.startup(config.startup_arguments()).await {
        engine.wait_for_fix().await;
        anyhow::bail!("startup did not complete, see the event log");
    }

    tracing::info!("observatory in operation, press Ctrl-C to close");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutdown requested");
    if !engine.shutdown().await {
        engine.wait_for_fix().await;
        anyhow::bail!("shutdown did not complete cleanly, see the event log");
    }

    Ok(())
}

/// Mirror every bus event into the log.
fn spawn_event_logger(event_bus: &InProcessEventBus) {
    let mut events = BroadcastStream::new(event_bus.subscribe());
    tokio::spawn(async move {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => tracing::info!(
                    event_type = ?event.event_type,
                    message = event.text().unwrap_or_default(),
                    "event"
                ),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged behind the bus");
                }
            }
        }
    });
}
