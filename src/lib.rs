// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Hearth-Sync: Google task integration for the Hearth household app
//!
//! This crate provides the backend service that links a household user's
//! Google account and aggregates their remote tasks alongside the rest
//! of the application.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::CredentialStore;
use services::{OAuthSessionManager, SelectionStore, TaskAggregator};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub selections: Arc<dyn SelectionStore>,
    pub oauth: OAuthSessionManager,
    pub aggregator: TaskAggregator,
}
