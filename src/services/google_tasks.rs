// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Tasks API client.
//!
//! Handles:
//! - Task list ("collection") and task fetching
//! - Single-task get/update round-trips
//! - OAuth code exchange and token refresh
//!
//! Remote responses are validated into explicit types at this boundary;
//! nothing above this module sees raw provider JSON.

use crate::error::AppError;
use crate::models::TaskStatus;
use crate::services::oauth::ProviderSession;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens issued by an authorization-code exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Space-separated scopes actually granted
    pub scope: Option<String>,
    /// Endpoint the tokens were issued by (used for later refreshes)
    pub token_endpoint: String,
}

/// Fresh access token from a refresh-token exchange.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// A remote task list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskCollection {
    pub id: String,
    pub title: String,
}

/// A task as the remote provider represents it.
///
/// `title` stays optional here; validation happens in the aggregator,
/// not at the wire boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Capability interface for the remote task provider.
///
/// Everything the core needs from Google: task-collection listing,
/// per-collection task listing, single-task get/update, and the two
/// OAuth token operations.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError>;

    /// Exchange a refresh token for a fresh access token.
    async fn refresh_access_token(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, AppError>;

    /// List all task collections visible to the session.
    async fn list_collections(
        &self,
        session: &ProviderSession,
    ) -> Result<Vec<TaskCollection>, AppError>;

    /// List the tasks in one collection.
    async fn list_tasks(
        &self,
        session: &ProviderSession,
        collection_id: &str,
    ) -> Result<Vec<RemoteTask>, AppError>;

    /// Fetch one task.
    async fn get_task(
        &self,
        session: &ProviderSession,
        collection_id: &str,
        task_id: &str,
    ) -> Result<RemoteTask, AppError>;

    /// Replace one task with the given representation.
    async fn update_task(
        &self,
        session: &ProviderSession,
        collection_id: &str,
        task_id: &str,
        task: &RemoteTask,
    ) -> Result<RemoteTask, AppError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// GoogleTasksClient - reqwest-backed implementation
// ─────────────────────────────────────────────────────────────────────────────

const GOOGLE_TASKS_BASE_URL: &str = "https://tasks.googleapis.com/tasks/v1";

/// Google Tasks API client.
#[derive(Clone)]
pub struct GoogleTasksClient {
    http: reqwest::Client,
    base_url: String,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleTasksClient {
    /// Create a new client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GOOGLE_TASKS_BASE_URL.to_string(),
            token_endpoint: crate::config::GOOGLE_TOKEN_ENDPOINT.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        session: &ProviderSession,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Google API rate limit hit (429)");
            }

            if status.as_u16() == 401 {
                return Err(AppError::Provider("Access token rejected (401)".to_string()));
            }

            return Err(AppError::Provider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }
}

/// Paged list wrapper used by the Tasks API.
#[derive(Deserialize)]
struct ListPage<T> {
    #[serde(default)]
    items: Vec<T>,
}

/// Token exchange response from Google OAuth.
#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    scope: Option<String>,
}

/// Token refresh response from Google OAuth.
#[derive(Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[async_trait]
impl TaskProvider for GoogleTasksClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Google token exchange failed");
            return Err(AppError::Provider(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let body: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse token response: {}", e)))?;

        Ok(TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in.max(0)),
            scope: body.scope,
            token_endpoint: self.token_endpoint.clone(),
        })
    }

    async fn refresh_access_token(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, AppError> {
        let response = self
            .http
            .post(token_endpoint)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Provider(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        let body: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse refresh response: {}", e)))?;

        Ok(RefreshedToken {
            access_token: body.access_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in.max(0)),
        })
    }

    async fn list_collections(
        &self,
        session: &ProviderSession,
    ) -> Result<Vec<TaskCollection>, AppError> {
        let url = format!("{}/users/@me/lists", self.base_url);
        let page: ListPage<TaskCollection> = self.get_json(&url, session).await?;
        Ok(page.items)
    }

    async fn list_tasks(
        &self,
        session: &ProviderSession,
        collection_id: &str,
    ) -> Result<Vec<RemoteTask>, AppError> {
        let url = format!(
            "{}/lists/{}/tasks",
            self.base_url,
            urlencoding::encode(collection_id)
        );
        let page: ListPage<RemoteTask> = self.get_json(&url, session).await?;
        Ok(page.items)
    }

    async fn get_task(
        &self,
        session: &ProviderSession,
        collection_id: &str,
        task_id: &str,
    ) -> Result<RemoteTask, AppError> {
        let url = format!(
            "{}/lists/{}/tasks/{}",
            self.base_url,
            urlencoding::encode(collection_id),
            urlencoding::encode(task_id)
        );
        self.get_json(&url, session).await
    }

    async fn update_task(
        &self,
        session: &ProviderSession,
        collection_id: &str,
        task_id: &str,
        task: &RemoteTask,
    ) -> Result<RemoteTask, AppError> {
        let url = format!(
            "{}/lists/{}/tasks/{}",
            self.base_url,
            urlencoding::encode(collection_id),
            urlencoding::encode(task_id)
        );

        let response = self
            .http
            .put(&url)
            .bearer_auth(session.access_token())
            .json(task)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }
}
