// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth session management.
//!
//! Drives the credential lifecycle for one user:
//! `NoCredential → Authorizing → Connected → (Expired ⇄ Connected via
//! Refresh) → Disconnected`. All token material flows through the
//! credential store; a refreshed token is persisted before any session
//! handle bound to it is handed out.

use crate::config::Config;
use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::Credential;
use crate::services::google_tasks::TaskProvider;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::Mutex;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Per-user mutexes serializing token refresh operations.
pub type RefreshLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// A live, authenticated handle for calling the remote provider,
/// bound to a currently-valid access token.
#[derive(Clone)]
pub struct ProviderSession {
    user_id: u64,
    access_token: String,
}

impl ProviderSession {
    fn new(user_id: u64, access_token: String) -> Self {
        Self {
            user_id,
            access_token,
        }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

// The access token must never leak through Debug formatting.
impl std::fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSession")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Result of starting an authorization flow.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Provider authorization URL to redirect the browser to
    pub redirect_url: String,
    /// Opaque state value the caller must hold and echo back
    pub state: String,
}

/// Feature-flag settings for an integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFlags {
    pub tasks: bool,
    pub calendar: bool,
    pub docs: bool,
}

/// Manages the OAuth credential lifecycle for all users.
#[derive(Clone)]
pub struct OAuthSessionManager {
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
    authorization_endpoint: String,
    state_key: Vec<u8>,
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn TaskProvider>,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl OAuthSessionManager {
    /// Create a new session manager.
    ///
    /// `refresh_locks` should be shared across all instances within the
    /// process so two requests for the same user serialize their
    /// refreshes.
    pub fn new(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn TaskProvider>,
        refresh_locks: RefreshLocks,
    ) -> Self {
        Self {
            client_id: config.google_client_id.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            scopes: crate::config::GOOGLE_SCOPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            authorization_endpoint: crate::config::GOOGLE_AUTH_ENDPOINT.to_string(),
            state_key: config.oauth_state_key.clone(),
            store,
            provider,
            refresh_locks,
        }
    }

    // ─── Authorization Flow ──────────────────────────────────────────────────

    /// Start the authorization flow for a user.
    ///
    /// The returned state must be held by the caller (session cookie)
    /// and passed back to [`Self::complete_authorization`].
    pub fn begin_authorization(&self, user_id: u64) -> Result<AuthorizationRequest, AppError> {
        let state = encode_state(&self.state_key, user_id)?;

        let redirect_url = format!(
            "{}?client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             include_granted_scopes=true&\
             prompt=consent&\
             state={}",
            self.authorization_endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scopes.join(" ")),
            state
        );

        tracing::info!(user_id, "Starting Google OAuth flow");

        Ok(AuthorizationRequest {
            redirect_url,
            state,
        })
    }

    /// Complete the authorization flow: validate the echoed state,
    /// exchange the code and persist the resulting credential.
    ///
    /// `expected_state` is the value the caller stored when the flow
    /// began; a missing or differing value aborts the flow with no
    /// credential written.
    pub async fn complete_authorization(
        &self,
        user_id: u64,
        code: &str,
        returned_state: &str,
        expected_state: Option<&str>,
    ) -> Result<Credential, AppError> {
        let Some(expected) = expected_state else {
            tracing::warn!(user_id, "OAuth callback without stored state");
            return Err(AppError::StateMismatch);
        };
        if returned_state != expected {
            tracing::warn!(user_id, "OAuth callback state differs from stored state");
            return Err(AppError::StateMismatch);
        }
        if !verify_state(&self.state_key, returned_state, user_id) {
            tracing::warn!(user_id, "OAuth state signature or user binding invalid");
            return Err(AppError::StateMismatch);
        }

        let grant = self.provider.exchange_code(code).await?;

        let now = Utc::now();
        let mut credential = self
            .store
            .get(user_id)
            .await?
            .unwrap_or_else(|| Credential::new(user_id, now));

        // Google omits the refresh token on re-consent; keep the old one.
        credential.refresh_token = grant.refresh_token.or(credential.refresh_token.take());
        credential.access_token = Some(grant.access_token);
        credential.token_endpoint = Some(grant.token_endpoint);
        credential.expires_at = Some(grant.expires_at);
        credential.updated_at = now;

        let granted = grant.scope.unwrap_or_else(|| self.scopes.join(" "));
        credential.tasks_enabled = granted.contains("/auth/tasks");
        credential.calendar_enabled = granted.contains("/auth/calendar");
        credential.docs_enabled = granted.contains("/auth/drive");

        self.store.upsert(&credential).await?;

        tracing::info!(
            user_id,
            tasks = credential.tasks_enabled,
            calendar = credential.calendar_enabled,
            docs = credential.docs_enabled,
            "Google account connected"
        );

        Ok(credential)
    }

    // ─── Session Acquisition ─────────────────────────────────────────────────

    /// Get a session bound to a valid access token, refreshing first if
    /// the stored token has expired.
    ///
    /// The refresh is serialized per user: after acquiring the lock the
    /// credential is re-read, since another request may have already
    /// refreshed while we waited. A successful refresh is persisted
    /// before the session is returned.
    pub async fn get_live_session(&self, user_id: u64) -> Result<ProviderSession, AppError> {
        let credential = self
            .store
            .get(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;
        if !credential.has_tokens() {
            return Err(AppError::NotConnected);
        }

        if let Some(token) = usable_access_token(&credential, Utc::now()) {
            return Ok(ProviderSession::new(user_id, token));
        }

        if credential.refresh_token.is_none() {
            return Err(AppError::RefreshUnavailable);
        }

        let lock = self
            .refresh_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        // Re-read after acquiring the lock; another request may have
        // refreshed while we waited.
        let mut credential = self
            .store
            .get(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;
        let now = Utc::now();
        if let Some(token) = usable_access_token(&credential, now) {
            return Ok(ProviderSession::new(user_id, token));
        }

        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or(AppError::RefreshUnavailable)?;
        let token_endpoint = credential
            .token_endpoint
            .clone()
            .unwrap_or_else(|| crate::config::GOOGLE_TOKEN_ENDPOINT.to_string());

        tracing::info!(user_id, "Access token expired, refreshing");

        let refreshed = self
            .provider
            .refresh_access_token(&token_endpoint, &refresh_token)
            .await?;

        credential.access_token = Some(refreshed.access_token.clone());
        credential.expires_at = Some(refreshed.expires_at);
        credential.updated_at = now;

        // Token and expiry land in one atomic write, and land before
        // any caller can use the new token.
        self.store.upsert(&credential).await?;

        tracing::info!(user_id, "Token refreshed");

        Ok(ProviderSession::new(user_id, refreshed.access_token))
    }

    // ─── Disconnect & Settings ───────────────────────────────────────────────

    /// Disconnect the integration: null tokens and flags, keep the row.
    pub async fn disconnect(&self, user_id: u64) -> Result<(), AppError> {
        self.store.clear(user_id).await?;
        tracing::info!(user_id, "Google account disconnected");
        Ok(())
    }

    /// Update the per-feature enable flags.
    ///
    /// Requires a connected credential so flags cannot be toggled on a
    /// link that no longer exists.
    pub async fn set_feature_flags(
        &self,
        user_id: u64,
        flags: FeatureFlags,
    ) -> Result<Credential, AppError> {
        let mut credential = self
            .store
            .get(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;
        if !credential.has_tokens() {
            return Err(AppError::Disconnected);
        }

        credential.tasks_enabled = flags.tasks;
        credential.calendar_enabled = flags.calendar;
        credential.docs_enabled = flags.docs;
        credential.updated_at = Utc::now();

        self.store.upsert(&credential).await?;

        tracing::info!(
            user_id,
            tasks = flags.tasks,
            calendar = flags.calendar,
            docs = flags.docs,
            "Integration settings updated"
        );

        Ok(credential)
    }
}

/// The stored access token, if it can be used without a refresh.
fn usable_access_token(credential: &Credential, now: DateTime<Utc>) -> Option<String> {
    if credential.is_expired(now) {
        return None;
    }
    credential.access_token.clone()
}

// ─── Opaque State Encoding ───────────────────────────────────────────────────

/// Build a signed opaque state value bound to the user and issue time.
///
/// Format before encoding: `user_id|timestamp_hex|signature_hex`.
fn encode_state(key: &[u8], user_id: u64) -> Result<String, AppError> {
    let timestamp = Utc::now().timestamp_millis();
    let payload = format!("{}|{:x}", user_id, timestamp);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and user binding of an echoed state value.
fn verify_state(key: &[u8], state: &str, user_id: u64) -> bool {
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(state) else {
        return false;
    };
    let Ok(state_str) = String::from_utf8(bytes) else {
        return false;
    };

    // Format is "user_id|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return false;
    }

    let payload = format!("{}|{}", parts[0], parts[1]);

    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if parts[2] != expected_signature {
        return false;
    }

    parts[0].parse::<u64>() == Ok(user_id)
}
