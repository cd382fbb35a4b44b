// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration state classification.
//!
//! Pure decision logic over credential store contents; no I/O. Callers
//! branch on the returned state instead of catching faults for
//! expected conditions like "not connected yet".

use crate::models::Credential;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Connection state of a user's Google integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationState {
    /// No credential row exists
    NotConnected,
    /// Row exists but both tokens are absent
    Disconnected,
    /// Tokens present but the tasks feature is switched off
    ConnectedNoFeature,
    /// Tokens present, feature on, access token provably expired.
    /// Informational for the UI; session acquisition refreshes
    /// transparently.
    NeedsRefresh,
    /// Tokens present, feature on, token usable as far as we can tell
    Ready,
}

/// Classify a user's integration from their stored credential.
pub fn classify(credential: Option<&Credential>, now: DateTime<Utc>) -> IntegrationState {
    let Some(credential) = credential else {
        return IntegrationState::NotConnected;
    };
    if !credential.has_tokens() {
        return IntegrationState::Disconnected;
    }
    if !credential.tasks_enabled {
        return IntegrationState::ConnectedNoFeature;
    }
    if credential.is_expired(now) {
        return IntegrationState::NeedsRefresh;
    }
    IntegrationState::Ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn connected(now: DateTime<Utc>) -> Credential {
        let mut cred = Credential::new(1, now);
        cred.access_token = Some("at".to_string());
        cred.refresh_token = Some("rt".to_string());
        cred.expires_at = Some(now + Duration::hours(1));
        cred.tasks_enabled = true;
        cred
    }

    #[test]
    fn test_no_row_is_not_connected() {
        assert_eq!(classify(None, Utc::now()), IntegrationState::NotConnected);
    }

    #[test]
    fn test_tokenless_row_is_disconnected() {
        let now = Utc::now();
        let cred = Credential::new(1, now);
        assert_eq!(classify(Some(&cred), now), IntegrationState::Disconnected);
    }

    #[test]
    fn test_feature_flag_off() {
        let now = Utc::now();
        let mut cred = connected(now);
        cred.tasks_enabled = false;
        assert_eq!(
            classify(Some(&cred), now),
            IntegrationState::ConnectedNoFeature
        );
    }

    #[test]
    fn test_expired_needs_refresh() {
        let now = Utc::now();
        let mut cred = connected(now);
        cred.expires_at = Some(now - Duration::minutes(5));
        assert_eq!(classify(Some(&cred), now), IntegrationState::NeedsRefresh);
    }

    #[test]
    fn test_valid_is_ready() {
        let now = Utc::now();
        let cred = connected(now);
        assert_eq!(classify(Some(&cred), now), IntegrationState::Ready);
    }

    #[test]
    fn test_unknown_expiry_with_refresh_token_is_ready() {
        let now = Utc::now();
        let mut cred = connected(now);
        cred.expires_at = None;
        assert_eq!(classify(Some(&cred), now), IntegrationState::Ready);
    }

    #[test]
    fn test_unknown_expiry_without_refresh_token_needs_refresh() {
        let now = Utc::now();
        let mut cred = connected(now);
        cred.expires_at = None;
        cred.refresh_token = None;
        assert_eq!(classify(Some(&cred), now), IntegrationState::NeedsRefresh);
    }
}
