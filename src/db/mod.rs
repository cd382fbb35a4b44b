//! Credential persistence layer.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreCredentials;
pub use memory::InMemoryCredentials;

use crate::error::AppError;
use crate::models::Credential;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Google integration credentials (keyed by user_id)
    pub const CREDENTIALS: &str = "google_credentials";
}

/// Typed key-value store for per-user OAuth credentials.
///
/// No validation logic lives here. Each `upsert` is a single atomic
/// document write so a token and its expiry can never be observed
/// half-updated; concurrent writers are last-write-wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential row for a user, if one exists.
    async fn get(&self, user_id: u64) -> Result<Option<Credential>, AppError>;

    /// Create or replace the credential row for `credential.user_id`.
    async fn upsert(&self, credential: &Credential) -> Result<(), AppError>;

    /// Null out tokens and feature flags, keeping the row.
    ///
    /// A missing row is not an error.
    async fn clear(&self, user_id: u64) -> Result<(), AppError>;
}
