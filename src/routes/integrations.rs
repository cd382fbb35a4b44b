// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google integration routes: OAuth connect flow and settings.
//!
//! The opaque OAuth state travels in a short-lived cookie; the callback
//! validates it against the value echoed by Google before any token
//! exchange happens. Callback outcomes are reported to the frontend via
//! redirect query parameters, with detail kept in the server logs.

use crate::db::CredentialStore;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::oauth::FeatureFlags;
use crate::services::policy::{classify, IntegrationState};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie holding the opaque OAuth state between connect and callback.
const OAUTH_STATE_COOKIE: &str = "google_oauth_state";

/// Integration routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/integrations/google", get(google_status))
        .route("/integrations/google/connect", get(google_connect))
        .route("/integrations/google/callback", get(google_callback))
        .route("/integrations/google/disconnect", post(google_disconnect))
        .route("/integrations/google/features", post(google_update_features))
}

// ─── Status ──────────────────────────────────────────────────

/// Integration status for the settings UI.
#[derive(Serialize)]
pub struct IntegrationStatusResponse {
    pub state: IntegrationState,
    pub tasks_enabled: bool,
    pub calendar_enabled: bool,
    pub docs_enabled: bool,
    /// When the account was first connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<String>,
}

/// Get the user's Google integration status.
async fn google_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<IntegrationStatusResponse>> {
    let credential = state.credentials.get(user.user_id).await?;
    let integration_state = classify(credential.as_ref(), chrono::Utc::now());

    let response = match credential {
        Some(cred) => IntegrationStatusResponse {
            state: integration_state,
            tasks_enabled: cred.tasks_enabled,
            calendar_enabled: cred.calendar_enabled,
            docs_enabled: cred.docs_enabled,
            connected_at: Some(format_utc_rfc3339(cred.created_at)),
        },
        None => IntegrationStatusResponse {
            state: integration_state,
            tasks_enabled: false,
            calendar_enabled: false,
            docs_enabled: false,
            connected_at: None,
        },
    };

    Ok(Json(response))
}

// ─── Connect Flow ────────────────────────────────────────────

/// Start the OAuth flow - redirect to Google authorization.
async fn google_connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let request = state.oauth.begin_authorization(user.user_id)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, request.state))
        .path("/integrations/google")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        Redirect::temporary(&request.redirect_url),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - validate state, exchange code, store credential.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let settings_url = format!(
        "{}/account/integrations/google",
        state.config.frontend_url
    );
    // One-shot value; remove it no matter how the callback goes.
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());
    // Removal cookie must carry the same path the cookie was set with.
    let removal = Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/integrations/google")
        .build();
    let jar = jar.remove(removal);

    if let Some(error) = params.error {
        tracing::warn!(user_id = user.user_id, error = %error, "OAuth error from Google");
        let redirect = format!("{}?error={}", settings_url, urlencoding::encode(&error));
        return (jar, Redirect::temporary(&redirect));
    }

    let (Some(code), Some(returned_state)) = (params.code, params.state) else {
        tracing::warn!(user_id = user.user_id, "OAuth callback missing code or state");
        let redirect = format!("{}?error=invalid_response", settings_url);
        return (jar, Redirect::temporary(&redirect));
    };

    match state
        .oauth
        .complete_authorization(
            user.user_id,
            &code,
            &returned_state,
            expected_state.as_deref(),
        )
        .await
    {
        Ok(_) => {
            let redirect = format!("{}?connected=true", settings_url);
            (jar, Redirect::temporary(&redirect))
        }
        Err(e) => {
            // Detail stays in the logs; the user gets a generic retry hint.
            tracing::error!(user_id = user.user_id, error = %e, "Google OAuth callback failed");
            let redirect = format!("{}?error=connection_failed", settings_url);
            (jar, Redirect::temporary(&redirect))
        }
    }
}

// ─── Disconnect & Settings ───────────────────────────────────

/// Response for disconnect.
#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

/// Disconnect the Google integration (tokens nulled, row kept).
async fn google_disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DisconnectResponse>> {
    state.oauth.disconnect(user.user_id).await?;

    Ok(Json(DisconnectResponse {
        success: true,
        message: "Disconnected from Google".to_string(),
    }))
}

/// Feature-flag update payload.
#[derive(Deserialize)]
pub struct UpdateFeaturesRequest {
    #[serde(default)]
    pub tasks: bool,
    #[serde(default)]
    pub calendar: bool,
    #[serde(default)]
    pub docs: bool,
}

/// Update which Google features are enabled.
async fn google_update_features(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateFeaturesRequest>,
) -> Result<Json<IntegrationStatusResponse>> {
    let credential = state
        .oauth
        .set_feature_flags(
            user.user_id,
            FeatureFlags {
                tasks: payload.tasks,
                calendar: payload.calendar,
                docs: payload.docs,
            },
        )
        .await?;

    Ok(Json(IntegrationStatusResponse {
        state: classify(Some(&credential), chrono::Utc::now()),
        tasks_enabled: credential.tasks_enabled,
        calendar_enabled: credential.calendar_enabled,
        docs_enabled: credential.docs_enabled,
        connected_at: Some(format_utc_rfc3339(credential.created_at)),
    }))
}
