// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hearth-Sync API Server
//!
//! Links household users' Google accounts and serves their aggregated
//! remote tasks to the Hearth frontend.

use hearth_sync::{
    config::Config,
    db::{CredentialStore, FirestoreCredentials},
    services::{
        GoogleTasksClient, OAuthSessionManager, SelectionStore, SessionSelections, TaskAggregator,
        TaskProvider,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Hearth-Sync API");

    // Initialize credential storage
    let credentials: Arc<dyn CredentialStore> = Arc::new(
        FirestoreCredentials::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore"),
    );

    // Google Tasks client
    let provider: Arc<dyn TaskProvider> = Arc::new(GoogleTasksClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
    ));

    // Per-session collection selections and per-user refresh locks,
    // shared across all requests within this instance
    let selections: Arc<dyn SelectionStore> = Arc::new(SessionSelections::new());
    let refresh_locks = Arc::new(dashmap::DashMap::new());

    let oauth = OAuthSessionManager::new(
        &config,
        credentials.clone(),
        provider.clone(),
        refresh_locks,
    );

    let aggregator = TaskAggregator::new(oauth.clone(), provider, selections.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        credentials,
        selections,
        oauth,
        aggregator,
    });

    // Build router
    let app = hearth_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hearth_sync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
