use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use auditra_core::UserIdentity;
use auditra_domain::{AuditEvent, EventDetails, NewAuditEventInput, Permission, RetentionTier};

use crate::test_support::{FakeEventStore, authorization_granting};

use super::{CleanupLimits, RetentionService};

fn aged_event(action: &str, age_days: i64, offset_secs: i64) -> AuditEvent {
    AuditEvent::record(
        NewAuditEventInput {
            action: action.to_owned(),
            actor_id: "user-7".to_owned(),
            actor_email: Some("user-7@example.test".to_owned()),
            target_id: None,
            details: EventDetails::new([("note".to_owned(), json!("seeded"))]),
        },
        Utc::now() - Duration::days(age_days) + Duration::seconds(offset_secs),
    )
}

fn service(store: Arc<FakeEventStore>, limits: CleanupLimits) -> RetentionService {
    RetentionService::with_limits(store, authorization_granting("nobody", Vec::new()), limits)
}

#[tokio::test]
async fn compression_pages_through_backlog_across_runs() {
    let store = FakeEventStore::new();
    for index in 0..150 {
        store.seed(aged_event("user_login", 100, index)).await;
    }
    let service = service(store.clone(), CleanupLimits::default());
    let now = Utc::now();

    let first = service.compress_aged_events(now).await;
    assert!(matches!(first, Ok(outcome) if outcome.compressed == 100 && outcome.batches == 1));

    let second = service.compress_aged_events(now).await;
    assert!(matches!(second, Ok(outcome) if outcome.compressed == 50));

    let third = service.compress_aged_events(now).await;
    assert!(matches!(third, Ok(outcome) if outcome.compressed == 0 && outcome.batches == 0));
}

#[tokio::test]
async fn compressed_records_never_rematch_the_scan() {
    let store = FakeEventStore::new();
    for index in 0..30 {
        store.seed(aged_event("user_login", 120, index)).await;
    }
    let service = service(store.clone(), CleanupLimits::default());
    let now = Utc::now();

    let first = service.compress_aged_events(now).await;
    assert!(matches!(first, Ok(outcome) if outcome.compressed == 30));

    let second = service.compress_aged_events(now).await;
    assert!(matches!(second, Ok(outcome) if outcome.compressed == 0));

    let events = store.snapshot().await;
    assert!(
        events
            .iter()
            .all(|stored| stored.event.retention_tier == RetentionTier::Compressed)
    );
}

#[tokio::test]
async fn fresh_events_are_not_compressed() {
    let store = FakeEventStore::new();
    store.seed(aged_event("user_login", 10, 0)).await;
    let service = service(store.clone(), CleanupLimits::default());

    let outcome = service.compress_aged_events(Utc::now()).await;

    assert!(matches!(outcome, Ok(outcome) if outcome.compressed == 0));
}

#[tokio::test]
async fn compression_respects_page_ceiling() {
    let store = FakeEventStore::new();
    for index in 0..50 {
        store.seed(aged_event("user_login", 100, index)).await;
    }
    let limits = CleanupLimits {
        page_size: 10,
        manual_page_size: 5,
        max_pages_per_tier: 3,
        max_documents_per_tier: 1_000,
    };
    let service = service(store.clone(), limits);

    let outcome = service.compress_aged_events(Utc::now()).await;

    assert!(matches!(outcome, Ok(outcome) if outcome.compressed == 30 && outcome.batches == 3));
}

#[tokio::test]
async fn expired_operational_events_are_deleted_and_compliance_survives() {
    let store = FakeEventStore::new();
    let operational_id = store.seed(aged_event("health_check", 100, 0)).await;
    let compliance_id = store.seed(aged_event("user_deleted", 100, 0)).await;
    let service = service(store.clone(), CleanupLimits::default());

    let outcome = service.delete_expired_events(Utc::now()).await;

    assert!(matches!(outcome, Ok(outcome) if outcome.deleted == 1));
    assert!(!store.contains(operational_id).await);
    assert!(store.contains(compliance_id).await);
}

#[tokio::test]
async fn compliance_events_survive_any_age() {
    let store = FakeEventStore::new();
    let ancient_id = store.seed(aged_event("user_deleted", 36_500, 0)).await;
    let service = service(store.clone(), CleanupLimits::default());

    let outcome = service.delete_expired_events(Utc::now()).await;

    assert!(matches!(outcome, Ok(outcome) if outcome.deleted == 0));
    assert!(store.contains(ancient_id).await);
}

#[tokio::test]
async fn compressed_records_age_out_under_origin_retention() {
    let store = FakeEventStore::new();
    let now = Utc::now();
    let expired = aged_event("user_login", 400, 0).into_compressed(now);
    let fresh = aged_event("user_login", 100, 0).into_compressed(now);
    let expired_id = store.seed(expired).await;
    let fresh_id = store.seed(fresh).await;
    let service = service(store.clone(), CleanupLimits::default());

    let outcome = service.delete_expired_events(now).await;

    assert!(matches!(outcome, Ok(outcome) if outcome.deleted == 1));
    assert!(!store.contains(expired_id).await);
    assert!(store.contains(fresh_id).await);
}

#[tokio::test]
async fn deletion_respects_per_tier_document_cap() {
    let store = FakeEventStore::new();
    for index in 0..40 {
        store.seed(aged_event("health_check", 100, index)).await;
    }
    let limits = CleanupLimits {
        page_size: 10,
        manual_page_size: 5,
        max_pages_per_tier: 100,
        max_documents_per_tier: 25,
    };
    let service = service(store.clone(), limits);

    let outcome = service.delete_expired_events(Utc::now()).await;

    assert!(matches!(outcome, Ok(outcome) if outcome.deleted == 25));
}

#[tokio::test]
async fn deletion_pages_through_backlog_up_to_document_cap() {
    let store = FakeEventStore::new();
    for index in 0..1_200 {
        store.seed(aged_event("health_check", 100, index)).await;
    }
    let service = service(store.clone(), CleanupLimits::default());

    let outcome = service.delete_expired_events(Utc::now()).await;
    assert!(matches!(outcome, Ok(outcome) if outcome.deleted == 1_000 && outcome.batches == 10));

    let remaining = service.delete_expired_events(Utc::now()).await;
    assert!(matches!(remaining, Ok(outcome) if outcome.deleted == 200));
}

#[tokio::test]
async fn scheduled_run_writes_completion_summary() {
    let store = FakeEventStore::new();
    for index in 0..5 {
        store.seed(aged_event("health_check", 100, index)).await;
    }
    let service = service(store.clone(), CleanupLimits::default());

    let report = service.run_scheduled_cleanup().await;
    assert!(matches!(report, Ok(report) if report.deleted == 5 && report.errors == 0));

    let events = store.snapshot().await;
    let summary = events
        .iter()
        .find(|stored| stored.event.action == "retention_cleanup");
    assert!(matches!(
        summary,
        Some(stored) if stored.event.actor_id == "system"
            && stored.event.retention_tier == RetentionTier::Operational
            && stored.event.details.get("deleted") == Some(&json!(5))
    ));
}

#[tokio::test]
async fn failed_run_records_failure_summary_and_surfaces_error() {
    let store = FakeEventStore::new();
    store.seed(aged_event("health_check", 100, 0)).await;
    store.fail_deletes();
    let service = service(store.clone(), CleanupLimits::default());

    let result = service.run_scheduled_cleanup().await;
    assert!(result.is_err());

    let events = store.snapshot().await;
    let summary = events
        .iter()
        .find(|stored| stored.event.action == "retention_cleanup_failed");
    assert!(matches!(
        summary,
        Some(stored) if stored.event.details.get("errors") == Some(&json!(1))
            && stored.event.details.get("error").is_some()
    ));
}

#[tokio::test]
async fn manual_run_requires_permission_and_mutates_nothing() {
    let store = FakeEventStore::new();
    store.seed(aged_event("health_check", 100, 0)).await;
    let service = RetentionService::new(
        store.clone(),
        authorization_granting("mallory", Vec::new()),
    );
    let actor = UserIdentity::new("mallory", "Mallory", None);

    let result = service.run_manual_cleanup(&actor).await;

    assert!(result.is_err());
    assert_eq!(store.mutation_count(), 0);
}

#[tokio::test]
async fn manual_run_stamps_actor_and_uses_reduced_page_size() {
    let store = FakeEventStore::new();
    for index in 0..80 {
        store.seed(aged_event("user_login", 100, index)).await;
    }
    let service = RetentionService::new(
        store.clone(),
        authorization_granting("alice", vec![Permission::SecurityRetentionRun]),
    );
    let actor = UserIdentity::new("alice", "Alice", Some("alice@example.test".to_owned()));

    let outcome = service.run_manual_cleanup(&actor).await;

    // Manual page size is 50, so one page per tier compresses 50 of the 80.
    assert!(matches!(
        &outcome,
        Ok(outcome) if outcome.report.compressed == 50 && !outcome.message.is_empty()
    ));

    let events = store.snapshot().await;
    let summary = events
        .iter()
        .find(|stored| stored.event.action == "retention_cleanup");
    assert!(matches!(
        summary,
        Some(stored) if stored.event.actor_id == "alice"
            && stored.event.details.get("trigger") == Some(&json!("manual"))
    ));
}
