use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use auditra_core::AppResult;
use auditra_domain::{AuditEvent, RetentionTier};

/// One persisted audit event together with its store identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAuditEvent {
    /// Stable store identifier.
    pub event_id: Uuid,
    /// The event record.
    pub event: AuditEvent,
}

impl StoredAuditEvent {
    /// Returns the pagination cursor for this record.
    #[must_use]
    pub fn cursor(&self) -> EventCursor {
        EventCursor {
            recorded_at: self.event.recorded_at,
            event_id: self.event_id,
        }
    }
}

/// Cursor into a `(recorded_at, event_id)` ordered scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCursor {
    /// Write timestamp of the last record of the previous page.
    pub recorded_at: DateTime<Utc>,
    /// Identifier of the last record of the previous page.
    pub event_id: Uuid,
}

/// One page request within a cursor-paginated scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum records returned.
    pub limit: usize,
    /// Resume the scan after this cursor, or from the beginning.
    pub start_after: Option<EventCursor>,
}

/// Filter for the most-recent-events listing used by analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEventsQuery {
    /// Lower bound on the write timestamp, inclusive.
    pub since: DateTime<Utc>,
    /// Optional exact action filter.
    pub action: Option<String>,
    /// Optional exact actor filter.
    pub actor_id: Option<String>,
    /// Maximum records returned, newest first.
    pub limit: usize,
}

/// Port to the audit event collection.
///
/// The store must support equality/range filters on `(retention_tier,
/// recorded_at)`, ascending ordering by write timestamp, cursor pagination,
/// atomic multi-record batch commits, and cheap counting queries.
#[async_trait]
pub trait AuditEventStore: Send + Sync {
    /// Appends a new immutable record and returns its identifier.
    async fn append(&self, event: AuditEvent) -> AppResult<Uuid>;

    /// Returns one ascending page of events in `tier` recorded before `cutoff`.
    async fn page_tier_older_than(
        &self,
        tier: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>>;

    /// Returns one ascending page of compressed records that originated in
    /// `origin` and were recorded before `cutoff`.
    async fn page_compressed_from_older_than(
        &self,
        origin: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>>;

    /// Replaces the listed records with their compressed projections as one
    /// atomic batch.
    async fn commit_compressed(&self, rewrites: Vec<StoredAuditEvent>) -> AppResult<()>;

    /// Permanently removes the listed records as one atomic batch.
    async fn delete_events(&self, event_ids: &[Uuid]) -> AppResult<()>;

    /// Counts all records in the collection.
    async fn count_events(&self) -> AppResult<u64>;

    /// Counts records currently in `tier`.
    async fn count_tier(&self, tier: RetentionTier) -> AppResult<u64>;

    /// Counts records written at or after `since`.
    async fn count_recorded_since(&self, since: DateTime<Utc>) -> AppResult<u64>;

    /// Lists the most recent records matching the filter, newest first.
    async fn list_recent(&self, query: RecentEventsQuery) -> AppResult<Vec<StoredAuditEvent>>;
}
