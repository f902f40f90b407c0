use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use auditra_application::{
    AuditEventStore, PageRequest, RecentEventsQuery, StoredAuditEvent,
};
use auditra_core::AppResult;
use auditra_domain::{AuditEvent, RetentionTier};

/// In-memory event store implementation for local development and tests.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<Uuid, AuditEvent>>,
}

impl InMemoryEventStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored record for an identifier, if present.
    pub async fn find_event(&self, event_id: Uuid) -> Option<StoredAuditEvent> {
        self.events
            .read()
            .await
            .get(&event_id)
            .map(|event| StoredAuditEvent {
                event_id,
                event: event.clone(),
            })
    }

    fn page_of(
        mut matching: Vec<StoredAuditEvent>,
        page: PageRequest,
    ) -> Vec<StoredAuditEvent> {
        matching.sort_by_key(|stored| (stored.event.recorded_at, stored.event_id));
        matching
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
impl AuditEventStore for InMemoryEventStore {
    async fn append(&self, event: AuditEvent) -> AppResult<Uuid> {
        let event_id = Uuid::new_v4();
        self.events.write().await.insert(event_id, event);
        Ok(event_id)
    }

    async fn page_tier_older_than(
        &self,
        tier: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>> {
        let events = self.events.read().await;
        let matching = events
            .iter()
            .filter(|(_, event)| event.retention_tier == tier && event.recorded_at < cutoff)
            .map(|(event_id, event)| StoredAuditEvent {
                event_id: *event_id,
                event: event.clone(),
            })
            .collect();

        Ok(Self::page_of(matching, page))
    }

    async fn page_compressed_from_older_than(
        &self,
        origin: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>> {
        let events = self.events.read().await;
        let matching = events
            .iter()
            .filter(|(_, event)| {
                event.retention_tier == RetentionTier::Compressed
                    && event.recorded_at < cutoff
                    && matches!(
                        event.compression,
                        Some(info) if info.compressed_from == origin
                    )
            })
            .map(|(event_id, event)| StoredAuditEvent {
                event_id: *event_id,
                event: event.clone(),
            })
            .collect();

        Ok(Self::page_of(matching, page))
    }

    async fn commit_compressed(&self, rewrites: Vec<StoredAuditEvent>) -> AppResult<()> {
        let mut events = self.events.write().await;
        for rewrite in rewrites {
            events.insert(rewrite.event_id, rewrite.event);
        }
        Ok(())
    }

    async fn delete_events(&self, event_ids: &[Uuid]) -> AppResult<()> {
        let mut events = self.events.write().await;
        for event_id in event_ids {
            events.remove(event_id);
        }
        Ok(())
    }

    async fn count_events(&self) -> AppResult<u64> {
        Ok(self.events.read().await.len() as u64)
    }

    async fn count_tier(&self, tier: RetentionTier) -> AppResult<u64> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|event| event.retention_tier == tier)
            .count() as u64)
    }

    async fn count_recorded_since(&self, since: DateTime<Utc>) -> AppResult<u64> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|event| event.recorded_at >= since)
            .count() as u64)
    }

    async fn list_recent(&self, query: RecentEventsQuery) -> AppResult<Vec<StoredAuditEvent>> {
        let events = self.events.read().await;
        let mut matching: Vec<StoredAuditEvent> = events
            .iter()
            .filter(|(_, event)| event.recorded_at >= query.since)
            .filter(|(_, event)| {
                query
                    .action
                    .as_deref()
                    .is_none_or(|action| event.action == action)
            })
            .filter(|(_, event)| {
                query
                    .actor_id
                    .as_deref()
                    .is_none_or(|actor_id| event.actor_id == actor_id)
            })
            .map(|(event_id, event)| StoredAuditEvent {
                event_id: *event_id,
                event: event.clone(),
            })
            .collect();
        matching.sort_by_key(|stored| std::cmp::Reverse(stored.event.recorded_at));
        matching.truncate(query.limit);
        Ok(matching)
    }
}
