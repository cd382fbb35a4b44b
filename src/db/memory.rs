//! In-memory credential store for tests and storage-free local runs.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::Credential;
use async_trait::async_trait;
use dashmap::DashMap;

/// Credential store backed by a process-local map.
///
/// Each entry write replaces the whole record, matching the atomicity
/// contract of the Firestore implementation.
#[derive(Default)]
pub struct InMemoryCredentials {
    rows: DashMap<u64, Credential>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentials {
    async fn get(&self, user_id: u64) -> Result<Option<Credential>, AppError> {
        Ok(self.rows.get(&user_id).map(|entry| entry.clone()))
    }

    async fn upsert(&self, credential: &Credential) -> Result<(), AppError> {
        self.rows.insert(credential.user_id, credential.clone());
        Ok(())
    }

    async fn clear(&self, user_id: u64) -> Result<(), AppError> {
        if let Some(mut entry) = self.rows.get_mut(&user_id) {
            entry.access_token = None;
            entry.refresh_token = None;
            entry.token_endpoint = None;
            entry.expires_at = None;
            entry.tasks_enabled = false;
            entry.calendar_enabled = false;
            entry.docs_enabled = false;
            entry.updated_at = chrono::Utc::now();
        }
        Ok(())
    }
}
