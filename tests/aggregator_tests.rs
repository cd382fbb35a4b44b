// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task aggregation tests: selection filtering, defaulting, validation
//! and the single-task update path, all against the fake provider.

use chrono::{Duration, Utc};
use hearth_sync::db::CredentialStore;
use hearth_sync::error::AppError;
use hearth_sync::models::TaskStatus;
use hearth_sync::services::aggregator::TaskUpdates;
use hearth_sync::services::SelectionStore;
use std::sync::atomic::Ordering;

mod common;
use common::{connected_credential, remote_task, test_harness, FakeProvider, TestHarness};

const USER: u64 = 42;

/// Provider with "Work" (2 tasks) and "Home" (1 task), listed in that
/// order, plus a valid connected credential.
async fn two_collection_harness() -> TestHarness {
    let provider = FakeProvider::new()
        .with_collection(
            "work",
            "Work",
            vec![remote_task("w1", Some("File expenses")), {
                let mut t = remote_task("w2", Some("Book travel"));
                t.notes = Some("before Friday".to_string());
                t
            }],
        )
        .with_collection("home", "Home", vec![remote_task("h1", Some("Fix the gate"))]);

    let h = test_harness(provider);
    h.store
        .upsert(&connected_credential(USER, Some(Utc::now() + Duration::hours(1))))
        .await
        .unwrap();
    h
}

#[tokio::test]
async fn test_selection_filter_skips_unselected_collections() {
    let h = two_collection_harness().await;

    let tasks = h
        .state
        .aggregator
        .list_tasks(USER, &["home".to_string()])
        .await
        .unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "h1");
    assert_eq!(tasks[0].collection_title, "Home");

    // "Work" tasks were never fetched
    assert_eq!(h.provider.fetched_collections(), vec!["home".to_string()]);
}

#[tokio::test]
async fn test_empty_selection_defaults_to_first_sorted_title() {
    let h = two_collection_harness().await;

    let tasks = h.state.aggregator.list_tasks(USER, &[]).await.unwrap();

    // "Home" sorts before "Work", so it becomes the default
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].collection_id, "home");

    // The default was persisted to the session sink
    assert_eq!(h.selections.selected(USER), vec!["home".to_string()]);
}

#[tokio::test]
async fn test_full_selection_concatenates_in_provider_order() {
    let h = two_collection_harness().await;

    let tasks = h
        .state
        .aggregator
        .list_tasks(USER, &["home".to_string(), "work".to_string()])
        .await
        .unwrap();

    // Provider collection order (Work first), not selection order
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["w1", "w2", "h1"]);
}

#[tokio::test]
async fn test_malformed_tasks_are_dropped() {
    let provider = FakeProvider::new().with_collection(
        "home",
        "Home",
        vec![
            remote_task("h1", Some("Fix the gate")),
            remote_task("h2", None),
            remote_task("h3", Some("   ")),
        ],
    );
    let h = test_harness(provider);
    h.store
        .upsert(&connected_credential(USER, Some(Utc::now() + Duration::hours(1))))
        .await
        .unwrap();

    let tasks = h
        .state
        .aggregator
        .list_tasks(USER, &["home".to_string()])
        .await
        .unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Fix the gate");
}

#[tokio::test]
async fn test_due_dates_are_normalized() {
    let provider = FakeProvider::new().with_collection("home", "Home", vec![{
        let mut t = remote_task("h1", Some("Fix the gate"));
        t.due = Some("2025-03-01T00:00:00.000Z".to_string());
        t
    }]);
    let h = test_harness(provider);
    h.store
        .upsert(&connected_credential(USER, Some(Utc::now() + Duration::hours(1))))
        .await
        .unwrap();

    let tasks = h
        .state
        .aggregator
        .list_tasks(USER, &["home".to_string()])
        .await
        .unwrap();

    assert_eq!(tasks[0].due.as_deref(), Some("2025-03-01T00:00:00Z"));
}

#[tokio::test]
async fn test_listing_refreshes_expired_token_first() {
    let provider = FakeProvider::new().with_collection(
        "home",
        "Home",
        vec![remote_task("h1", Some("Fix the gate"))],
    );
    let h = test_harness(provider);
    h.store
        .upsert(&connected_credential(
            USER,
            Some(Utc::now() - Duration::minutes(5)),
        ))
        .await
        .unwrap();

    let tasks = h
        .state
        .aggregator
        .list_tasks(USER, &["home".to_string()])
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);

    // Every provider call carried the refreshed token, never the stale one
    assert_eq!(h.provider.refresh_calls.load(Ordering::SeqCst), 1);
    let seen = h.provider.seen_tokens.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|t| t == "refreshed-access-0"));
}

#[tokio::test]
async fn test_listing_failure_propagates_provider_error() {
    let h = two_collection_harness().await;
    h.provider.fail_listing.store(true, Ordering::SeqCst);

    let result = h
        .state
        .aggregator
        .list_tasks(USER, &["home".to_string()])
        .await;

    assert!(matches!(result, Err(AppError::Provider(_))));
}

#[tokio::test]
async fn test_update_merges_only_given_fields() {
    let h = two_collection_harness().await;

    let record = h
        .state
        .aggregator
        .update_task(
            USER,
            "work",
            "w2",
            TaskUpdates {
                status: Some(TaskStatus::Completed),
                notes: None,
                due: None,
            },
        )
        .await
        .unwrap();

    // Status changed; title and notes kept from the remote state
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.title, "Book travel");
    assert_eq!(record.notes.as_deref(), Some("before Friday"));
    assert_eq!(record.collection_title, "Work");

    assert_eq!(h.provider.get_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.provider.update_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_update_failure_surfaces_as_update_failed() {
    let h = two_collection_harness().await;
    h.provider.fail_update.store(true, Ordering::SeqCst);

    let result = h
        .state
        .aggregator
        .update_task(
            USER,
            "work",
            "w1",
            TaskUpdates {
                status: Some(TaskStatus::Completed),
                notes: None,
                due: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::UpdateFailed(_))));
    // Single attempt, no retry
    assert_eq!(h.provider.update_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_update_of_unknown_task_fails() {
    let h = two_collection_harness().await;

    let result = h
        .state
        .aggregator
        .update_task(
            USER,
            "work",
            "missing",
            TaskUpdates {
                notes: Some("hello".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::UpdateFailed(_))));
    assert_eq!(h.provider.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_requires_connection() {
    let h = test_harness(
        FakeProvider::new().with_collection("home", "Home", vec![remote_task("h1", Some("x"))]),
    );

    let result = h
        .state
        .aggregator
        .update_task(
            USER,
            "home",
            "h1",
            TaskUpdates {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotConnected)));
}
