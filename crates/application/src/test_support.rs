//! Shared fakes for service tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use auditra_core::{AppError, AppResult};
use auditra_domain::{AuditEvent, Permission, RetentionTier};

use crate::authorization_service::{AuthorizationRepository, AuthorizationService};
use crate::event_store::{
    AuditEventStore, PageRequest, RecentEventsQuery, StoredAuditEvent,
};

/// In-memory fake of the event store port with cursor-ordered paging.
#[derive(Default)]
pub(crate) struct FakeEventStore {
    events: Mutex<Vec<StoredAuditEvent>>,
    mutations: AtomicU64,
    fail_deletes: AtomicBool,
}

impl FakeEventStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a pre-built event, bypassing classification.
    pub(crate) async fn seed(&self, event: AuditEvent) -> Uuid {
        let event_id = Uuid::new_v4();
        self.events
            .lock()
            .await
            .push(StoredAuditEvent { event_id, event });
        event_id
    }

    pub(crate) async fn snapshot(&self) -> Vec<StoredAuditEvent> {
        self.events.lock().await.clone()
    }

    pub(crate) async fn contains(&self, event_id: Uuid) -> bool {
        self.events
            .lock()
            .await
            .iter()
            .any(|stored| stored.event_id == event_id)
    }

    pub(crate) fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Makes every subsequent batch delete fail like a store outage.
    pub(crate) fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    fn sorted_ascending(mut records: Vec<StoredAuditEvent>) -> Vec<StoredAuditEvent> {
        records.sort_by_key(|stored| (stored.event.recorded_at, stored.event_id));
        records
    }

    fn apply_page(records: Vec<StoredAuditEvent>, page: PageRequest) -> Vec<StoredAuditEvent> {
        Self::sorted_ascending(records)
            .into_iter()
            .filter(|stored| match page.start_after {
                Some(cursor) => {
                    (stored.event.recorded_at, stored.event_id)
                        > (cursor.recorded_at, cursor.event_id)
                }
                None => true,
            })
            .take(page.limit)
            .collect()
    }
}

#[async_trait]
impl AuditEventStore for FakeEventStore {
    async fn append(&self, event: AuditEvent) -> AppResult<Uuid> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(self.seed(event).await)
    }

    async fn page_tier_older_than(
        &self,
        tier: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>> {
        let matching = self
            .events
            .lock()
            .await
            .iter()
            .filter(|stored| {
                stored.event.retention_tier == tier && stored.event.recorded_at < cutoff
            })
            .cloned()
            .collect();
        Ok(Self::apply_page(matching, page))
    }

    async fn page_compressed_from_older_than(
        &self,
        origin: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>> {
        let matching = self
            .events
            .lock()
            .await
            .iter()
            .filter(|stored| {
                stored.event.recorded_at < cutoff
                    && matches!(
                        stored.event.compression,
                        Some(info) if info.compressed_from == origin
                    )
                    && stored.event.retention_tier == RetentionTier::Compressed
            })
            .cloned()
            .collect();
        Ok(Self::apply_page(matching, page))
    }

    async fn commit_compressed(&self, rewrites: Vec<StoredAuditEvent>) -> AppResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut events = self.events.lock().await;
        for rewrite in rewrites {
            if let Some(stored) = events
                .iter_mut()
                .find(|stored| stored.event_id == rewrite.event_id)
            {
                stored.event = rewrite.event;
            }
        }
        Ok(())
    }

    async fn delete_events(&self, event_ids: &[Uuid]) -> AppResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "event store unavailable during batch delete".to_owned(),
            ));
        }

        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.events
            .lock()
            .await
            .retain(|stored| !event_ids.contains(&stored.event_id));
        Ok(())
    }

    async fn count_events(&self) -> AppResult<u64> {
        Ok(self.events.lock().await.len() as u64)
    }

    async fn count_tier(&self, tier: RetentionTier) -> AppResult<u64> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|stored| stored.event.retention_tier == tier)
            .count() as u64)
    }

    async fn count_recorded_since(&self, since: DateTime<Utc>) -> AppResult<u64> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|stored| stored.event.recorded_at >= since)
            .count() as u64)
    }

    async fn list_recent(&self, query: RecentEventsQuery) -> AppResult<Vec<StoredAuditEvent>> {
        let mut matching: Vec<StoredAuditEvent> = self
            .events
            .lock()
            .await
            .iter()
            .filter(|stored| stored.event.recorded_at >= query.since)
            .filter(|stored| {
                query
                    .action
                    .as_deref()
                    .is_none_or(|action| stored.event.action == action)
            })
            .filter(|stored| {
                query
                    .actor_id
                    .as_deref()
                    .is_none_or(|actor_id| stored.event.actor_id == actor_id)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|stored| std::cmp::Reverse(stored.event.recorded_at));
        matching.truncate(query.limit);
        Ok(matching)
    }
}

/// Fixed-grant fake for the authorization port.
pub(crate) struct FakeAuthorizationRepository {
    grants: HashMap<String, Vec<Permission>>,
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_permissions_for_subject(&self, subject: &str) -> AppResult<Vec<Permission>> {
        Ok(self.grants.get(subject).cloned().unwrap_or_default())
    }
}

/// Builds an authorization service granting `permissions` to `subject`.
pub(crate) fn authorization_granting(
    subject: &str,
    permissions: Vec<Permission>,
) -> AuthorizationService {
    AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
        grants: HashMap::from([(subject.to_owned(), permissions)]),
    }))
}
