//! Rendezvous Service - HTTP API for event credits and applications
//!
//! This is the main entry point for the rendezvous service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rendezvous_service::{
    create_router, spawn_expiry_sweep, AppState, ServiceConfig, StorageBackend,
};
use rendezvous_store::{Database, RocksStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rendezvous=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rendezvous Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        storage_backend = ?config.storage_backend,
        admins = config.admin_user_ids.len(),
        service_key_configured = %config.service_api_key.is_some(),
        "Service configuration loaded"
    );

    let db = match config.storage_backend {
        StorageBackend::RocksDb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Database::new(Arc::new(RocksStore::open(&config.data_dir)?))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage - records are lost on restart");
            Database::in_memory()
        }
    };

    // Build app state
    let state = AppState::new(Arc::new(db), config.clone());

    if let Some(secs) = config.expiry_sweep_interval_seconds {
        tracing::info!(interval_seconds = secs, "Starting event expiry sweep");
        spawn_expiry_sweep(Arc::new(state.clone()), Duration::from_secs(secs));
    }

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
