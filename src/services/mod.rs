// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod google_tasks;
pub mod oauth;
pub mod policy;

pub use aggregator::{SelectionStore, SessionSelections, TaskAggregator, TaskUpdates};
pub use google_tasks::{GoogleTasksClient, TaskProvider};
pub use oauth::{FeatureFlags, OAuthSessionManager, ProviderSession, RefreshLocks};
pub use policy::{classify, IntegrationState};
