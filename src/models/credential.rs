//! Per-user Google OAuth credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth state for one user's Google link.
///
/// One row per user. Tokens are nulled (not row-deleted) on disconnect
/// so the row's history survives a reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Household user ID (also used as document ID)
    pub user_id: u64,
    /// OAuth access token (secret, opaque)
    pub access_token: Option<String>,
    /// OAuth refresh token (secret, opaque)
    pub refresh_token: Option<String>,
    /// Token endpoint the tokens were issued by
    pub token_endpoint: Option<String>,
    /// When the access token expires; `None` means unknown
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether Google Tasks sync is enabled
    pub tasks_enabled: bool,
    /// Whether Google Calendar sync is enabled
    pub calendar_enabled: bool,
    /// Whether Google Docs access is enabled
    pub docs_enabled: bool,
    /// When the user first connected
    pub created_at: DateTime<Utc>,
    /// Last token refresh or settings change
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Create a fresh, token-less record for a user.
    pub fn new(user_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            access_token: None,
            refresh_token: None,
            token_endpoint: None,
            expires_at: None,
            tasks_enabled: false,
            calendar_enabled: false,
            docs_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether any token material is present at all.
    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }

    /// Whether the access token must be refreshed before use.
    ///
    /// An unknown expiry is trusted while a refresh token exists (a
    /// rejected call will force a refresh anyway); without a refresh
    /// token an unknown expiry is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => self.refresh_token.is_none(),
        }
    }
}
