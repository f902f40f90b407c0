use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use auditra_application::{
    AuditEventStore, PageRequest, RecentEventsQuery, StoredAuditEvent,
};
use auditra_core::{AppError, AppResult};
use auditra_domain::{AuditEvent, CompressionInfo, EventDetails, RetentionTier};

/// PostgreSQL-backed event store over the `audit_events` table.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EVENT_COLUMNS: &str = "\
    id, action, actor_id, actor_email, target_id, details, recorded_at, \
    retention_tier, compress_after, delete_after, compressed_at, original_size, \
    compressed_from";

#[derive(Debug, FromRow)]
struct AuditEventRow {
    id: Uuid,
    action: String,
    actor_id: String,
    actor_email: Option<String>,
    target_id: Option<String>,
    details: serde_json::Value,
    recorded_at: DateTime<Utc>,
    retention_tier: String,
    compress_after: DateTime<Utc>,
    delete_after: DateTime<Utc>,
    compressed_at: Option<DateTime<Utc>>,
    original_size: Option<i64>,
    compressed_from: Option<String>,
}

impl AuditEventRow {
    fn try_into_stored(self) -> AppResult<StoredAuditEvent> {
        let retention_tier =
            RetentionTier::from_str(self.retention_tier.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "audit event '{}' carries an invalid tier: {error}",
                    self.id
                ))
            })?;

        let compression = match (self.compressed_at, self.compressed_from) {
            (Some(compressed_at), Some(compressed_from)) => Some(CompressionInfo {
                compressed_at,
                original_size: self.original_size.unwrap_or(0).max(0) as u64,
                compressed_from: RetentionTier::from_str(compressed_from.as_str()).map_err(
                    |error| {
                        AppError::Internal(format!(
                            "audit event '{}' carries an invalid origin tier: {error}",
                            self.id
                        ))
                    },
                )?,
            }),
            _ => None,
        };

        // Rows written before details were enforced as an object degrade to
        // an empty payload instead of failing the whole page.
        let details = match self.details {
            serde_json::Value::Object(map) => EventDetails::from(map),
            _ => EventDetails::empty(),
        };

        Ok(StoredAuditEvent {
            event_id: self.id,
            event: AuditEvent {
                action: self.action,
                actor_id: self.actor_id,
                actor_email: self.actor_email,
                target_id: self.target_id,
                details,
                recorded_at: self.recorded_at,
                retention_tier,
                compress_after: self.compress_after,
                delete_after: self.delete_after,
                compression,
            },
        })
    }
}

#[async_trait]
impl AuditEventStore for PostgresEventStore {
    async fn append(&self, event: AuditEvent) -> AppResult<Uuid> {
        let event_id = Uuid::new_v4();
        let details = serde_json::Value::Object(event.details.as_map().clone());

        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, action, actor_id, actor_email, target_id, details,
                recorded_at, retention_tier, compress_after, delete_after,
                compressed_at, original_size, compressed_from
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(event_id)
        .bind(event.action.as_str())
        .bind(event.actor_id.as_str())
        .bind(event.actor_email.as_deref())
        .bind(event.target_id.as_deref())
        .bind(details)
        .bind(event.recorded_at)
        .bind(event.retention_tier.as_str())
        .bind(event.compress_after)
        .bind(event.delete_after)
        .bind(event.compression.map(|info| info.compressed_at))
        .bind(event.compression.map(|info| info.original_size as i64))
        .bind(
            event
                .compression
                .map(|info| info.compressed_from.as_str()),
        )
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(event_id)
    }

    async fn page_tier_older_than(
        &self,
        tier: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM audit_events
            WHERE retention_tier = $1
                AND recorded_at < $2
                AND ($3::TIMESTAMPTZ IS NULL OR (recorded_at, id) > ($3, $4))
            ORDER BY recorded_at ASC, id ASC
            LIMIT $5
            "#
        ))
        .bind(tier.as_str())
        .bind(cutoff)
        .bind(page.start_after.map(|cursor| cursor.recorded_at))
        .bind(page.start_after.map(|cursor| cursor.event_id))
        .bind(page.limit.min(10_000) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to page audit events: {error}")))?;

        rows.into_iter()
            .map(AuditEventRow::try_into_stored)
            .collect()
    }

    async fn page_compressed_from_older_than(
        &self,
        origin: RetentionTier,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> AppResult<Vec<StoredAuditEvent>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM audit_events
            WHERE retention_tier = 'compressed'
                AND compressed_from = $1
                AND recorded_at < $2
                AND ($3::TIMESTAMPTZ IS NULL OR (recorded_at, id) > ($3, $4))
            ORDER BY recorded_at ASC, id ASC
            LIMIT $5
            "#
        ))
        .bind(origin.as_str())
        .bind(cutoff)
        .bind(page.start_after.map(|cursor| cursor.recorded_at))
        .bind(page.start_after.map(|cursor| cursor.event_id))
        .bind(page.limit.min(10_000) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to page compressed audit events: {error}"))
        })?;

        rows.into_iter()
            .map(AuditEventRow::try_into_stored)
            .collect()
    }

    async fn commit_compressed(&self, rewrites: Vec<StoredAuditEvent>) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin compression batch: {error}"))
        })?;

        for rewrite in rewrites {
            let Some(info) = rewrite.event.compression else {
                return Err(AppError::Internal(format!(
                    "compression rewrite for '{}' is missing compression metadata",
                    rewrite.event_id
                )));
            };

            sqlx::query(
                r#"
                UPDATE audit_events
                SET retention_tier = 'compressed',
                    actor_email = NULL,
                    details = '{}'::JSONB,
                    compressed_at = $2,
                    original_size = $3,
                    compressed_from = $4
                WHERE id = $1
                "#,
            )
            .bind(rewrite.event_id)
            .bind(info.compressed_at)
            .bind(info.original_size as i64)
            .bind(info.compressed_from.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to compress audit event: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit compression batch: {error}"))
        })
    }

    async fn delete_events(&self, event_ids: &[Uuid]) -> AppResult<()> {
        sqlx::query("DELETE FROM audit_events WHERE id = ANY($1)")
            .bind(event_ids)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete audit events: {error}"))
            })?;

        Ok(())
    }

    async fn count_events(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to count audit events: {error}"))
            })?;

        Ok(count.max(0) as u64)
    }

    async fn count_tier(&self, tier: RetentionTier) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE retention_tier = $1")
                .bind(tier.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to count tier events: {error}"))
                })?;

        Ok(count.max(0) as u64)
    }

    async fn count_recorded_since(&self, since: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE recorded_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to count recent events: {error}"))
                })?;

        Ok(count.max(0) as u64)
    }

    async fn list_recent(&self, query: RecentEventsQuery) -> AppResult<Vec<StoredAuditEvent>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM audit_events
            WHERE recorded_at >= $1
                AND ($2::TEXT IS NULL OR action = $2)
                AND ($3::TEXT IS NULL OR actor_id = $3)
            ORDER BY recorded_at DESC
            LIMIT $4
            "#
        ))
        .bind(query.since)
        .bind(query.action)
        .bind(query.actor_id)
        .bind(query.limit.min(10_000) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list recent audit events: {error}"))
        })?;

        rows.into_iter()
            .map(AuditEventRow::try_into_stored)
            .collect()
    }
}
