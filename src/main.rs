// SPDX-License-Identifier: MIT

//! ClipStream Account API Server
//!
//! Handles user registration with media uploads, password login issuing
//! access/refresh token pairs, token refresh, and logout.

use clipstream::{
    config::Config,
    db::FirestoreDb,
    services::{MediaService, TokenService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting ClipStream Account API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize media store client
    let media = MediaService::new(&config);
    tracing::info!(url = %config.media_api_url, "Media store client initialized");

    // Token service holds the signing keys for the process lifetime
    let tokens = TokenService::new(&config);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        media,
        tokens,
    });

    // Build router
    let app = clipstream::routes::create_router(state);

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
                .add_directive("clipstream=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
