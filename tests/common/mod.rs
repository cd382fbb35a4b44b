// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hearth_sync::config::Config;
use hearth_sync::db::{CredentialStore, InMemoryCredentials};
use hearth_sync::error::AppError;
use hearth_sync::models::Credential;
use hearth_sync::routes::create_router;
use hearth_sync::services::google_tasks::{
    RefreshedToken, RemoteTask, TaskCollection, TaskProvider, TokenGrant,
};
use hearth_sync::services::{
    OAuthSessionManager, ProviderSession, SelectionStore, SessionSelections, TaskAggregator,
};
use hearth_sync::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test Firestore credential store against the emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> hearth_sync::db::FirestoreCredentials {
    hearth_sync::db::FirestoreCredentials::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Fake remote task provider with canned data and call accounting.
#[derive(Default)]
pub struct FakeProvider {
    pub collections: Mutex<Vec<TaskCollection>>,
    /// Tasks per collection id
    pub tasks: Mutex<HashMap<String, Vec<RemoteTask>>>,
    /// Scope string echoed by the code exchange
    pub granted_scope: Mutex<Option<String>>,
    /// Refresh token returned by the code exchange
    pub grant_refresh_token: Mutex<Option<String>>,

    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub collection_list_calls: AtomicUsize,
    /// Collection ids whose tasks were fetched, in call order
    pub task_list_calls: Mutex<Vec<String>>,
    pub get_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    /// Access tokens the provider saw on data calls
    pub seen_tokens: Mutex<Vec<String>>,

    pub fail_listing: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub fail_update: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        *provider.grant_refresh_token.lock().unwrap() = Some("granted-refresh".to_string());
        provider
    }

    pub fn with_collection(self, id: &str, title: &str, tasks: Vec<RemoteTask>) -> Self {
        self.collections.lock().unwrap().push(TaskCollection {
            id: id.to_string(),
            title: title.to_string(),
        });
        self.tasks.lock().unwrap().insert(id.to_string(), tasks);
        self
    }

    pub fn fetched_collections(&self) -> Vec<String> {
        self.task_list_calls.lock().unwrap().clone()
    }

    fn record_token(&self, session: &ProviderSession) {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(session.access_token().to_string());
    }
}

#[async_trait]
impl TaskProvider for FakeProvider {
    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, AppError> {
        let n = self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            access_token: format!("granted-access-{}", n),
            refresh_token: self.grant_refresh_token.lock().unwrap().clone(),
            expires_at: Utc::now() + Duration::hours(1),
            scope: self.granted_scope.lock().unwrap().clone(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
        })
    }

    async fn refresh_access_token(
        &self,
        _token_endpoint: &str,
        _refresh_token: &str,
    ) -> Result<RefreshedToken, AppError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(AppError::Provider("refresh rejected".to_string()));
        }
        Ok(RefreshedToken {
            access_token: format!("refreshed-access-{}", n),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn list_collections(
        &self,
        session: &ProviderSession,
    ) -> Result<Vec<TaskCollection>, AppError> {
        self.record_token(session);
        self.collection_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AppError::Provider("listing unavailable".to_string()));
        }
        Ok(self.collections.lock().unwrap().clone())
    }

    async fn list_tasks(
        &self,
        session: &ProviderSession,
        collection_id: &str,
    ) -> Result<Vec<RemoteTask>, AppError> {
        self.record_token(session);
        self.task_list_calls
            .lock()
            .unwrap()
            .push(collection_id.to_string());
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AppError::Provider("listing unavailable".to_string()));
        }
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_task(
        &self,
        session: &ProviderSession,
        collection_id: &str,
        task_id: &str,
    ) -> Result<RemoteTask, AppError> {
        self.record_token(session);
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.tasks
            .lock()
            .unwrap()
            .get(collection_id)
            .and_then(|tasks| tasks.iter().find(|t| t.id == task_id))
            .cloned()
            .ok_or_else(|| AppError::Provider(format!("task {} not found", task_id)))
    }

    async fn update_task(
        &self,
        session: &ProviderSession,
        collection_id: &str,
        task_id: &str,
        task: &RemoteTask,
    ) -> Result<RemoteTask, AppError> {
        self.record_token(session);
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::Provider("update rejected".to_string()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(list) = tasks.get_mut(collection_id) {
            if let Some(slot) = list.iter_mut().find(|t| t.id == task_id) {
                *slot = task.clone();
            }
        }
        Ok(task.clone())
    }
}

/// Build a remote task with sensible defaults.
#[allow(dead_code)]
pub fn remote_task(id: &str, title: Option<&str>) -> RemoteTask {
    RemoteTask {
        id: id.to_string(),
        title: title.map(|t| t.to_string()),
        notes: None,
        due: None,
        status: Default::default(),
        completed: None,
        parent: None,
    }
}

/// A connected, tasks-enabled credential.
#[allow(dead_code)]
pub fn connected_credential(user_id: u64, expires_at: Option<DateTime<Utc>>) -> Credential {
    let now = Utc::now();
    let mut cred = Credential::new(user_id, now);
    cred.access_token = Some("stored-access".to_string());
    cred.refresh_token = Some("stored-refresh".to_string());
    cred.token_endpoint = Some("https://oauth2.googleapis.com/token".to_string());
    cred.expires_at = expires_at;
    cred.tasks_enabled = true;
    cred
}

/// Everything a test needs to drive the services or the router.
#[allow(dead_code)]
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryCredentials>,
    pub selections: Arc<SessionSelections>,
    pub provider: Arc<FakeProvider>,
    pub signing_key: Vec<u8>,
}

/// Create a full app wired to in-memory fakes.
#[allow(dead_code)]
pub fn test_harness(provider: FakeProvider) -> TestHarness {
    let config = Config::default();
    let signing_key = config.jwt_signing_key.clone();

    let store = Arc::new(InMemoryCredentials::new());
    let selections = Arc::new(SessionSelections::new());
    let provider = Arc::new(provider);

    let credentials: Arc<dyn CredentialStore> = store.clone();
    let selection_store: Arc<dyn SelectionStore> = selections.clone();
    let provider_dyn: Arc<dyn TaskProvider> = provider.clone();

    let refresh_locks = Arc::new(dashmap::DashMap::new());
    let oauth = OAuthSessionManager::new(
        &config,
        credentials.clone(),
        provider_dyn.clone(),
        refresh_locks,
    );
    let aggregator = TaskAggregator::new(oauth.clone(), provider_dyn, selection_store.clone());

    let state = Arc::new(AppState {
        config,
        credentials,
        selections: selection_store,
        oauth,
        aggregator,
    });

    TestHarness {
        state,
        store,
        selections,
        provider,
        signing_key,
    }
}

#[allow(dead_code)]
pub fn test_router(harness: &TestHarness) -> axum::Router {
    create_router(harness.state.clone())
}

/// Create a test JWT token for the session middleware.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}
