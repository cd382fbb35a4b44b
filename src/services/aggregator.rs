// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task aggregation across remote collections.
//!
//! Produces the unified, validated task view for one user and pushes
//! single-task edits back to the provider. Nothing here is cached:
//! every query rebuilds the view from the remote source of truth.

use crate::error::AppError;
use crate::models::{TaskRecord, TaskStatus};
use crate::services::google_tasks::{RemoteTask, TaskProvider};
use crate::services::oauth::OAuthSessionManager;
use crate::time_utils::normalize_timestamp;
use dashmap::DashMap;
use futures_util::future;
use std::sync::Arc;

/// Session-scoped store of the collection ids a user has chosen to view.
pub trait SelectionStore: Send + Sync {
    /// The user's current selection, in choice order.
    fn selected(&self, user_id: u64) -> Vec<String>;

    /// Replace the user's selection.
    fn set_selected(&self, user_id: u64, ids: Vec<String>);
}

/// In-process selection store, living for the lifetime of the server.
#[derive(Default)]
pub struct SessionSelections {
    selections: DashMap<u64, Vec<String>>,
}

impl SessionSelections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for SessionSelections {
    fn selected(&self, user_id: u64) -> Vec<String> {
        self.selections
            .get(&user_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    fn set_selected(&self, user_id: u64, ids: Vec<String>) {
        self.selections.insert(user_id, ids);
    }
}

/// Partial update of one task. Only fields that are `Some` are applied.
///
/// `due` must already be in the provider's expected timestamp form.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdates {
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub due: Option<String>,
}

impl TaskUpdates {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.due.is_none()
    }
}

/// Aggregates remote tasks into a unified per-user view.
#[derive(Clone)]
pub struct TaskAggregator {
    oauth: OAuthSessionManager,
    provider: Arc<dyn TaskProvider>,
    selections: Arc<dyn SelectionStore>,
}

impl TaskAggregator {
    pub fn new(
        oauth: OAuthSessionManager,
        provider: Arc<dyn TaskProvider>,
        selections: Arc<dyn SelectionStore>,
    ) -> Self {
        Self {
            oauth,
            provider,
            selections,
        }
    }

    /// List validated, normalized tasks from the selected collections.
    ///
    /// An empty selection defaults to the first collection by sorted
    /// display name, and the default is written back to the selection
    /// store so it sticks for the session. Collections outside the
    /// selection are not queried at all. Records come back in
    /// provider-collection order; display ordering is the caller's
    /// concern.
    pub async fn list_tasks(
        &self,
        user_id: u64,
        selected_collection_ids: &[String],
    ) -> Result<Vec<TaskRecord>, AppError> {
        let session = self.oauth.get_live_session(user_id).await?;

        let collections = self.provider.list_collections(&session).await?;
        if collections.is_empty() {
            return Ok(Vec::new());
        }

        let mut selection: Vec<String> = Vec::new();
        for id in selected_collection_ids {
            if !selection.contains(id) {
                selection.push(id.clone());
            }
        }

        if selection.is_empty() {
            if let Some(default) = collections.iter().min_by(|a, b| a.title.cmp(&b.title)) {
                selection.push(default.id.clone());
                self.selections.set_selected(user_id, selection.clone());
                tracing::debug!(user_id, collection = %default.title, "Defaulted task list selection");
            }
        }

        let chosen: Vec<_> = collections
            .iter()
            .filter(|c| selection.iter().any(|id| id == &c.id))
            .collect();

        // Fetch per-collection pages concurrently; try_join_all keeps
        // the provider's collection order.
        let pages = future::try_join_all(
            chosen
                .iter()
                .map(|c| self.provider.list_tasks(&session, &c.id)),
        )
        .await?;

        let mut records = Vec::new();
        let mut dropped = 0usize;

        for (collection, tasks) in chosen.iter().zip(pages) {
            for raw in tasks {
                match build_record(raw, &collection.id, &collection.title) {
                    Some(record) => records.push(record),
                    None => dropped += 1,
                }
            }
        }

        if dropped > 0 {
            tracing::warn!(user_id, dropped, "Dropped malformed remote tasks");
        }

        tracing::info!(user_id, count = records.len(), "Aggregated remote tasks");

        Ok(records)
    }

    /// Apply a partial update to one remote task.
    ///
    /// The current remote representation is fetched, the given fields
    /// are merged onto it, and the merged task is submitted back.
    /// A single attempt; remote failures surface as `UpdateFailed`.
    pub async fn update_task(
        &self,
        user_id: u64,
        collection_id: &str,
        task_id: &str,
        updates: TaskUpdates,
    ) -> Result<TaskRecord, AppError> {
        let session = self.oauth.get_live_session(user_id).await?;

        let mut task = self
            .provider
            .get_task(&session, collection_id, task_id)
            .await
            .map_err(|e| AppError::UpdateFailed(format!("fetching current task: {}", e)))?;

        if let Some(status) = updates.status {
            task.status = status;
        }
        if let Some(notes) = updates.notes {
            task.notes = Some(notes);
        }
        if let Some(due) = updates.due {
            task.due = Some(due);
        }

        let confirmed = self
            .provider
            .update_task(&session, collection_id, task_id, &task)
            .await
            .map_err(|e| AppError::UpdateFailed(e.to_string()))?;

        tracing::info!(user_id, collection_id, task_id, "Task updated");

        // Best-effort display-name lookup; the update already happened.
        let collection_title = match self.provider.list_collections(&session).await {
            Ok(collections) => collections
                .into_iter()
                .find(|c| c.id == collection_id)
                .map(|c| c.title),
            Err(e) => {
                tracing::debug!(user_id, error = %e, "Collection title lookup failed");
                None
            }
        }
        .unwrap_or_else(|| collection_id.to_string());

        build_record(confirmed, collection_id, &collection_title).ok_or_else(|| {
            AppError::UpdateFailed("provider returned a task without a title".to_string())
        })
    }
}

/// Validate and normalize one raw remote task.
///
/// Returns `None` for records without a usable title; those are
/// dropped from aggregation, never surfaced.
fn build_record(raw: RemoteTask, collection_id: &str, collection_title: &str) -> Option<TaskRecord> {
    let title = raw.title.as_deref().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return None;
    }

    Some(TaskRecord {
        id: raw.id,
        collection_id: collection_id.to_string(),
        collection_title: collection_title.to_string(),
        title: title.to_string(),
        notes: raw.notes,
        due: raw.due.as_deref().map(normalize_timestamp),
        status: raw.status,
        completed_at: raw.completed.as_deref().map(normalize_timestamp),
        parent: raw.parent,
    })
}
