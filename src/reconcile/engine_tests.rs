//! End-to-end tests for reconciliation passes against in-memory fakes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Weekday;
use tokio_util::sync::CancellationToken;

use super::engine::ReconciliationEngine;
use super::error::{PropagationError, ReconcileError, RepropagateError};
use crate::schedule::Direction;
use crate::status::{CommitState, STATUS_CONTEXT};
use crate::store::{ConfigStore, MemoryConfigStore, StoreError};
use crate::test_utils::{FailingStore, FakeHostingApi, FakeInstallations, config_with_window, tick_on};
use crate::types::{RepoId, RepositoryConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn monday_nine_to_six(name: &str, available: bool) -> RepositoryConfig {
    config_with_window("acme", name, Weekday::Mon, 9, 18, available)
}

fn engine_with(
    api: &FakeHostingApi,
    configs: Vec<RepositoryConfig>,
) -> (
    ReconciliationEngine<FakeInstallations, MemoryConfigStore>,
    Arc<MemoryConfigStore>,
) {
    let installations = FakeInstallations::new(api.clone()).with_installation(1, "acme");
    let store = Arc::new(MemoryConfigStore::with_configs(configs));
    (
        ReconciliationEngine::new(Arc::new(installations), Arc::clone(&store)),
        store,
    )
}

async fn availability(store: &MemoryConfigStore, name: &str) -> bool {
    store
        .get_config(&RepoId::new("acme", name))
        .await
        .unwrap()
        .merge_available
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn monday_nine_opens_and_marks_pull_requests_success() {
    let api = FakeHostingApi::new();
    let repo = RepoId::new("acme", "widgets");
    let pulls = api.add_open_pulls(&repo, 3);
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", false)]);

    let report = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.transitions, vec![(repo.clone(), Direction::Open)]);
    assert_eq!(report.pull_requests_updated, 3);
    assert!(availability(&store, "widgets").await);
    for pull in &pulls {
        let status = api.status_for(&repo, &pull.head_sha).unwrap();
        assert_eq!(status.state, CommitState::Success);
        assert_eq!(status.context, STATUS_CONTEXT);
        assert_eq!(status.description, "merge-chance-time is open");
    }
}

#[tokio::test]
async fn monday_eighteen_closes_and_marks_pull_requests_pending() {
    let api = FakeHostingApi::new();
    let repo = RepoId::new("acme", "widgets");
    let pulls = api.add_open_pulls(&repo, 2);
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", true)]);

    let report = engine
        .reconcile(tick_on(Weekday::Mon, 18), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.transitions, vec![(repo.clone(), Direction::Close)]);
    assert!(!availability(&store, "widgets").await);
    for pull in &pulls {
        let status = api.status_for(&repo, &pull.head_sha).unwrap();
        assert_eq!(status.state, CommitState::Pending);
        assert_eq!(status.description, "merge-chance-time is pending");
    }
}

#[tokio::test]
async fn duplicate_tick_has_no_transition() {
    let api = FakeHostingApi::new();
    api.add_open_pulls(&RepoId::new("acme", "widgets"), 2);
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", false)]);
    let cancel = CancellationToken::new();

    engine.reconcile(tick_on(Weekday::Mon, 9), &cancel).await.unwrap();
    let writes_after_first = api.status_write_count();

    let second = engine.reconcile(tick_on(Weekday::Mon, 9), &cancel).await.unwrap();

    assert!(second.transitions.is_empty());
    assert_eq!(second.pull_requests_updated, 0);
    assert_eq!(api.status_write_count(), writes_after_first);
    assert!(availability(&store, "widgets").await);
}

#[tokio::test]
async fn hours_without_a_boundary_touch_nothing() {
    let api = FakeHostingApi::new();
    api.add_open_pulls(&RepoId::new("acme", "widgets"), 1);
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", false)]);

    let report = engine
        .reconcile(tick_on(Weekday::Mon, 12), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.transitions.is_empty());
    assert_eq!(api.status_write_count(), 0);
    assert!(!availability(&store, "widgets").await);
}

// ─────────────────────────────────────────────────────────────────────────────
// Fatal setup failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dangling_owner_aborts_and_persists_nothing() {
    let api = FakeHostingApi::new();
    api.add_open_pulls(&RepoId::new("acme", "widgets"), 1);
    let (engine, store) = engine_with(
        &api,
        vec![
            monday_nine_to_six("widgets", false),
            config_with_window("departed", "legacy", Weekday::Mon, 9, 18, false),
        ],
    );

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::DanglingConfig { ref owner } if owner == "departed"));
    assert!(!availability(&store, "widgets").await);
    assert_eq!(api.status_write_count(), 0);
}

#[tokio::test]
async fn installation_listing_failure_is_fatal() {
    let api = FakeHostingApi::new();
    let installations = FakeInstallations::new(api.clone())
        .with_installation(1, "acme")
        .failing();
    let store = Arc::new(MemoryConfigStore::with_configs([monday_nine_to_six(
        "widgets", false,
    )]));
    let engine = ReconciliationEngine::new(Arc::new(installations), Arc::clone(&store));

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::InstallationList(_)));
    assert!(!availability(&store, "widgets").await);
}

#[tokio::test]
async fn unavailable_store_is_fatal() {
    let api = FakeHostingApi::new();
    let installations = FakeInstallations::new(api.clone()).with_installation(1, "acme");
    let engine = ReconciliationEngine::new(
        Arc::new(installations),
        Arc::new(FailingStore::unavailable()),
    );

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Store(StoreError::Unavailable(_))
    ));
    assert_eq!(api.status_write_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Partial failure
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_repository_is_named_and_all_are_persisted() {
    let api = FakeHostingApi::new();
    let a = RepoId::new("acme", "a");
    let b = RepoId::new("acme", "b");
    let c = RepoId::new("acme", "c");
    let pulls_a = api.add_open_pulls(&a, 2);
    api.add_open_pulls(&b, 2);
    let pulls_c = api.add_open_pulls(&c, 2);
    api.fail_listing_for(b.clone());
    let (engine, store) = engine_with(
        &api,
        vec![
            monday_nine_to_six("a", false),
            monday_nine_to_six("b", false),
            monday_nine_to_six("c", false),
        ],
    );

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap_err();

    let failures = match err {
        ReconcileError::StatusPropagation(failures) => failures,
        other => panic!("expected StatusPropagation, got {other:?}"),
    };
    assert_eq!(failures.repos().cloned().collect::<Vec<_>>(), vec![b]);
    assert!(matches!(
        failures.iter().next().map(|f| &f.error),
        Some(PropagationError::ListPullRequests(_))
    ));

    for name in ["a", "b", "c"] {
        assert!(availability(&store, name).await, "{name} not persisted");
    }
    for pull in pulls_a.iter().chain(&pulls_c) {
        assert_eq!(
            api.status_for(&pull.repo, &pull.head_sha).unwrap().state,
            CommitState::Success
        );
    }
}

#[tokio::test]
async fn status_write_failures_fail_only_their_repository() {
    let api = FakeHostingApi::new();
    let a = RepoId::new("acme", "a");
    let b = RepoId::new("acme", "b");
    api.add_open_pulls(&a, 1);
    api.add_open_pulls(&b, 3);
    api.fail_statuses_for(b.clone());
    let (engine, store) = engine_with(
        &api,
        vec![monday_nine_to_six("a", true), monday_nine_to_six("b", true)],
    );

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 18), &CancellationToken::new())
        .await
        .unwrap_err();

    let failures = match err {
        ReconcileError::StatusPropagation(failures) => failures,
        other => panic!("expected StatusPropagation, got {other:?}"),
    };
    assert_eq!(failures.len(), 1);
    match &failures.iter().next().unwrap().error {
        PropagationError::Statuses { failed, total } => {
            assert_eq!(failed.len(), 3);
            assert_eq!(*total, 3);
        }
        other => panic!("expected Statuses, got {other:?}"),
    }
    assert!(!availability(&store, "a").await);
    assert!(!availability(&store, "b").await);
}

#[tokio::test]
async fn persistence_failure_is_reported_after_fan_out() {
    let api = FakeHostingApi::new();
    let repo = RepoId::new("acme", "widgets");
    api.add_open_pulls(&repo, 1);
    let installations = FakeInstallations::new(api.clone()).with_installation(1, "acme");
    let store = Arc::new(FailingStore::read_only([monday_nine_to_six(
        "widgets", false,
    )]));
    let engine = ReconciliationEngine::new(Arc::new(installations), Arc::clone(&store));

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Persist(_)));
    assert_eq!(store.write_attempts(), 1);
    // Statuses are idempotent, so having written them is harmless.
    assert_eq!(api.status_write_count(), 1);
}

#[tokio::test]
async fn only_transitioned_configs_are_written() {
    let api = FakeHostingApi::new();
    let installations = FakeInstallations::new(api.clone()).with_installation(1, "acme");
    let mut quiet = monday_nine_to_six("quiet", false);
    quiet.schedule = crate::schedule::WeeklySchedule::empty();
    let store = Arc::new(FailingStore::read_only([quiet]));
    let engine = ReconciliationEngine::new(Arc::new(installations), Arc::clone(&store));

    let report = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.transitions.is_empty());
    assert_eq!(store.write_attempts(), 0);
}

#[tokio::test]
async fn panicking_task_fails_only_its_repository() {
    let api = FakeHostingApi::new();
    let a = RepoId::new("acme", "a");
    let b = RepoId::new("acme", "b");
    let c = RepoId::new("acme", "c");
    let pulls_a = api.add_open_pulls(&a, 1);
    api.add_open_pulls(&b, 1);
    let pulls_c = api.add_open_pulls(&c, 1);
    api.panic_listing_for(b.clone());
    let (engine, store) = engine_with(
        &api,
        vec![
            monday_nine_to_six("a", false),
            monday_nine_to_six("b", false),
            monday_nine_to_six("c", false),
        ],
    );

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &CancellationToken::new())
        .await
        .unwrap_err();

    let failures = match err {
        ReconcileError::StatusPropagation(failures) => failures,
        other => panic!("expected StatusPropagation, got {other:?}"),
    };
    assert_eq!(failures.repos().cloned().collect::<Vec<_>>(), vec![b]);
    assert!(matches!(
        failures.iter().next().map(|f| &f.error),
        Some(PropagationError::TaskFailed)
    ));
    for name in ["a", "b", "c"] {
        assert!(availability(&store, name).await, "{name} not persisted");
    }
    for pull in pulls_a.iter().chain(&pulls_c) {
        assert_eq!(
            api.status_for(&pull.repo, &pull.head_sha).unwrap().state,
            CommitState::Success
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_is_persisted_while_fan_out_is_still_running() {
    let api = FakeHostingApi::new();
    let repo = RepoId::new("acme", "widgets");
    let pulls = api.add_open_pulls(&repo, 2);
    let release = api.hold_listings();
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", false)]);
    let cancel = CancellationToken::new();

    let pass = engine.reconcile(tick_on(Weekday::Mon, 9), &cancel);
    let observer = async {
        // Listings are held, so the flag can only be stored ahead of the fan-out.
        while !availability(&store, "widgets").await {
            tokio::task::yield_now().await;
        }
        assert_eq!(api.status_write_count(), 0);
        release.cancel();
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(pass, observer)
    })
    .await
    .expect("persistence waited for the fan-out");

    result.unwrap();
    for pull in &pulls {
        assert_eq!(
            api.status_for(&repo, &pull.head_sha).unwrap().state,
            CommitState::Success
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelling_during_fan_out_aborts_the_pass() {
    let api = FakeHostingApi::new();
    api.add_open_pulls(&RepoId::new("acme", "a"), 1);
    api.add_open_pulls(&RepoId::new("acme", "b"), 1);
    let _held = api.hold_listings();
    let (engine, _store) = engine_with(
        &api,
        vec![monday_nine_to_six("a", false), monday_nine_to_six("b", false)],
    );
    let cancel = CancellationToken::new();

    let pass = engine.reconcile(tick_on(Weekday::Mon, 9), &cancel);
    let canceller = async {
        while api.listings_started() == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(pass, canceller)
    })
    .await
    .expect("cancellation did not stop the pass");

    assert!(matches!(result, Err(ReconcileError::Cancelled)));
    assert_eq!(api.status_write_count(), 0);
}

#[tokio::test]
async fn cancelled_token_aborts_before_any_work() {
    let api = FakeHostingApi::new();
    api.add_open_pulls(&RepoId::new("acme", "widgets"), 1);
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", false)]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine
        .reconcile(tick_on(Weekday::Mon, 9), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Cancelled));
    assert!(!availability(&store, "widgets").await);
    assert_eq!(api.status_write_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Operator re-trigger
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repropagate_reapplies_without_transition() {
    let api = FakeHostingApi::new();
    let repo = RepoId::new("acme", "widgets");
    let pulls = api.add_open_pulls(&repo, 2);
    let (engine, store) = engine_with(&api, vec![monday_nine_to_six("widgets", true)]);

    let outcome = engine
        .repropagate(&repo, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.merge_available);
    assert_eq!(outcome.pull_requests, 2);
    assert!(availability(&store, "widgets").await);
    for pull in &pulls {
        assert_eq!(
            api.status_for(&repo, &pull.head_sha).unwrap().state,
            CommitState::Success
        );
    }
}

#[tokio::test]
async fn repropagate_unknown_repository_is_not_found() {
    let api = FakeHostingApi::new();
    let (engine, _store) = engine_with(&api, vec![]);

    let err = engine
        .repropagate(&RepoId::new("acme", "missing"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RepropagateError::Store(StoreError::NotFound(_))));
}

#[tokio::test]
async fn repropagate_requires_installation() {
    let api = FakeHostingApi::new();
    let installations = FakeInstallations::new(api.clone());
    let store = Arc::new(MemoryConfigStore::with_configs([monday_nine_to_six(
        "widgets", true,
    )]));
    let engine = ReconciliationEngine::new(Arc::new(installations), store);

    let err = engine
        .repropagate(&RepoId::new("acme", "widgets"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RepropagateError::NotInstalled(_)));
}
