//! Aggregated task view models.
//!
//! `TaskRecord` is derived from the remote provider on every query and
//! is never persisted; the remote copy stays the source of truth.

use serde::{Deserialize, Serialize};

/// Completion state of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "needsAction")]
    NeedsAction,
    #[serde(rename = "completed")]
    Completed,
}

/// One remote task, validated and normalized for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Remote task ID
    pub id: String,
    /// Owning task collection (remote "task list") ID
    pub collection_id: String,
    /// Owning collection display name
    pub collection_title: String,
    /// Task title (always non-empty)
    pub title: String,
    /// Free-text notes
    pub notes: Option<String>,
    /// Due timestamp in canonical form, when present
    pub due: Option<String>,
    /// Completion state
    pub status: TaskStatus,
    /// Completion timestamp in canonical form, when completed
    pub completed_at: Option<String>,
    /// Parent task ID for subtasks
    pub parent: Option<String>,
}
