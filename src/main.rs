// SPDX-License-Identifier: MIT

//! Campus-Hub API Server
//!
//! Serves the campus club and event management API: identity and sessions,
//! OTP verification, role-gated dashboards, club membership, and event
//! registration.

use campus_hub::{config::Config, db::Database, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Campus-Hub API");

    // In-memory store seeded with the demo clubs and events
    let db = Database::with_seed_data();

    // Build shared state (provider, auth, OTP, outbox, cache)
    let state = Arc::new(AppState::new(config.clone(), db));

    // Build router
    let app = campus_hub::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("campus_hub=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
