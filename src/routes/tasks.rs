// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Aggregated task routes.
//!
//! Listing degrades gracefully: a not-connected account or a provider
//! outage produces an empty task list plus an advisory message, never
//! a hard failure. Update errors propagate instead, since the user
//! needs to know their edit did not take effect.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{TaskRecord, TaskStatus};
use crate::services::aggregator::TaskUpdates;
use crate::services::policy::{classify, IntegrationState};
use crate::services::SelectionStore;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use validator::Validate;

/// Task routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/update", post(update_task))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct TaskListQuery {
    /// Collection ids to view; repeatable (`?list=a&list=b`).
    /// Overrides and replaces the session's stored selection.
    #[serde(default)]
    list: Vec<String>,
}

/// Aggregated task listing response.
#[derive(Serialize)]
pub struct TaskListResponse {
    pub state: IntegrationState,
    pub tasks: Vec<TaskRecord>,
    /// Unique collection display names present in the result, sorted
    pub collections: Vec<String>,
    /// The effective collection-id selection after defaulting
    pub selected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl TaskListResponse {
    fn empty(state: IntegrationState, advisory: &str) -> Self {
        Self {
            state,
            tasks: Vec::new(),
            collections: Vec::new(),
            selected: Vec::new(),
            advisory: Some(advisory.to_string()),
        }
    }
}

/// List the user's remote tasks across their selected collections.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>> {
    let user_id = user.user_id;

    let credential = state.credentials.get(user_id).await?;
    let integration_state = classify(credential.as_ref(), chrono::Utc::now());

    match integration_state {
        IntegrationState::NotConnected | IntegrationState::Disconnected => {
            return Ok(Json(TaskListResponse::empty(
                integration_state,
                "Connect your Google account to see your tasks",
            )));
        }
        IntegrationState::ConnectedNoFeature => {
            return Ok(Json(TaskListResponse::empty(
                integration_state,
                "Google Tasks is disabled in your integration settings",
            )));
        }
        IntegrationState::NeedsRefresh | IntegrationState::Ready => {}
    }

    // An explicit query selection replaces the session's stored choice.
    let selection = if query.list.is_empty() {
        state.selections.selected(user_id)
    } else {
        state.selections.set_selected(user_id, query.list.clone());
        query.list
    };

    let tasks = match state.aggregator.list_tasks(user_id, &selection).await {
        Ok(tasks) => tasks,
        Err(AppError::Provider(msg)) => {
            tracing::error!(user_id, error = %msg, "Task listing failed");
            return Ok(Json(TaskListResponse::empty(
                integration_state,
                "Your Google Tasks could not be loaded right now",
            )));
        }
        Err(AppError::RefreshUnavailable) => {
            return Ok(Json(TaskListResponse::empty(
                integration_state,
                "Reconnect your Google account to see your tasks",
            )));
        }
        Err(e) => return Err(e),
    };

    let collections: Vec<String> = tasks
        .iter()
        .map(|t| t.collection_title.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Re-read: the aggregator persists a default when none was chosen.
    let selected = state.selections.selected(user_id);

    Ok(Json(TaskListResponse {
        state: integration_state,
        tasks,
        collections,
        selected,
        advisory: None,
    }))
}

// ─── Update ──────────────────────────────────────────────────

/// Partial task update payload.
///
/// `due`, when present, must already be in the provider's expected
/// RFC3339 form.
#[derive(Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1))]
    pub task_list_id: String,
    #[validate(length(min = 1))]
    pub task_id: String,
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub due: Option<String>,
}

/// Apply a partial update to one remote task.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRecord>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let credential = state.credentials.get(user.user_id).await?;
    match classify(credential.as_ref(), chrono::Utc::now()) {
        IntegrationState::NotConnected => return Err(AppError::NotConnected),
        IntegrationState::Disconnected => return Err(AppError::Disconnected),
        IntegrationState::ConnectedNoFeature => return Err(AppError::FeatureDisabled),
        IntegrationState::NeedsRefresh | IntegrationState::Ready => {}
    }

    let updates = TaskUpdates {
        status: payload.status,
        notes: payload.notes,
        due: payload.due,
    };
    if updates.is_empty() {
        return Err(AppError::BadRequest(
            "At least one of status, notes or due is required".to_string(),
        ));
    }

    let record = state
        .aggregator
        .update_task(user.user_id, &payload.task_list_id, &payload.task_id, updates)
        .await?;

    Ok(Json(record))
}
