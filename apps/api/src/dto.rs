//! Request and response types for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use auditra_application::{
    ActionCount, ActorCount, AuditAnalytics, CleanupReport, GrowthProjection,
    ManualCleanupOutcome, RetentionStats, TierUsage, TrendBucket,
};

/// Health probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Request body for recording an audit event.
#[derive(Debug, Deserialize)]
pub struct RecordAuditEventRequest {
    pub action: String,
    pub target_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Identifier of a newly recorded event.
#[derive(Debug, Serialize)]
pub struct RecordedEventResponse {
    pub event_id: Uuid,
}

/// Statistics of one completed cleanup run.
#[derive(Debug, Serialize)]
pub struct CleanupReportResponse {
    pub trigger: String,
    pub scanned: u64,
    pub compressed: u64,
    pub deleted: u64,
    pub errors: u64,
    pub batches: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl From<CleanupReport> for CleanupReportResponse {
    fn from(value: CleanupReport) -> Self {
        Self {
            trigger: value.trigger.as_str().to_owned(),
            scanned: value.scanned,
            compressed: value.compressed,
            deleted: value.deleted,
            errors: value.errors,
            batches: value.batches,
            started_at: value.started_at,
            finished_at: value.finished_at,
            duration_ms: value.duration_ms(),
        }
    }
}

/// Outcome of a manually triggered cleanup.
#[derive(Debug, Serialize)]
pub struct ManualCleanupResponse {
    pub message: String,
    pub report: CleanupReportResponse,
}

impl From<ManualCleanupOutcome> for ManualCleanupResponse {
    fn from(value: ManualCleanupOutcome) -> Self {
        Self {
            message: value.message,
            report: CleanupReportResponse::from(value.report),
        }
    }
}

/// Per-tier usage entry.
#[derive(Debug, Serialize)]
pub struct TierUsageResponse {
    pub tier: String,
    pub events: u64,
    pub estimated_bytes: u64,
}

impl From<TierUsage> for TierUsageResponse {
    fn from(value: TierUsage) -> Self {
        Self {
            tier: value.tier.as_str().to_owned(),
            events: value.events,
            estimated_bytes: value.estimated_bytes,
        }
    }
}

/// Growth projection entry.
#[derive(Debug, Serialize)]
pub struct GrowthProjectionResponse {
    pub daily_average: f64,
    pub next_30_days: f64,
    pub next_365_days: f64,
}

impl From<GrowthProjection> for GrowthProjectionResponse {
    fn from(value: GrowthProjection) -> Self {
        Self {
            daily_average: value.daily_average,
            next_30_days: value.next_30_days,
            next_365_days: value.next_365_days,
        }
    }
}

/// Aggregate retention and storage report.
#[derive(Debug, Serialize)]
pub struct RetentionStatsResponse {
    pub generated_at: DateTime<Utc>,
    pub total_events: u64,
    pub tiers: Vec<TierUsageResponse>,
    pub compressed_events: u64,
    pub compression_ratio: f64,
    pub recent_events: u64,
    pub estimated_total_bytes: u64,
    pub health: String,
    pub growth: GrowthProjectionResponse,
}

impl From<RetentionStats> for RetentionStatsResponse {
    fn from(value: RetentionStats) -> Self {
        Self {
            generated_at: value.generated_at,
            total_events: value.total_events,
            tiers: value
                .tiers
                .into_iter()
                .map(TierUsageResponse::from)
                .collect(),
            compressed_events: value.compressed_events,
            compression_ratio: value.compression_ratio,
            recent_events: value.recent_events,
            estimated_total_bytes: value.estimated_total_bytes,
            health: value.health.as_str().to_owned(),
            growth: GrowthProjectionResponse::from(value.growth),
        }
    }
}

/// Action frequency entry.
#[derive(Debug, Serialize)]
pub struct ActionCountResponse {
    pub action: String,
    pub events: u64,
}

impl From<ActionCount> for ActionCountResponse {
    fn from(value: ActionCount) -> Self {
        Self {
            action: value.action,
            events: value.events,
        }
    }
}

/// Actor frequency entry.
#[derive(Debug, Serialize)]
pub struct ActorCountResponse {
    pub actor_id: String,
    pub events: u64,
}

impl From<ActorCount> for ActorCountResponse {
    fn from(value: ActorCount) -> Self {
        Self {
            actor_id: value.actor_id,
            events: value.events,
        }
    }
}

/// Trend bucket entry.
#[derive(Debug, Serialize)]
pub struct TrendBucketResponse {
    pub bucket_start: DateTime<Utc>,
    pub events: u64,
}

impl From<TrendBucket> for TrendBucketResponse {
    fn from(value: TrendBucket) -> Self {
        Self {
            bucket_start: value.bucket_start,
            events: value.events,
        }
    }
}

/// Activity analytics report.
#[derive(Debug, Serialize)]
pub struct AuditAnalyticsResponse {
    pub range: String,
    pub sampled_events: u64,
    pub hourly_activity: Vec<u64>,
    pub peak_hour: u8,
    pub weekday_activity: Vec<u64>,
    pub peak_weekday: u8,
    pub top_actions: Vec<ActionCountResponse>,
    pub top_actors: Vec<ActorCountResponse>,
    pub security_events: u64,
    pub error_events: u64,
    pub error_rate: f64,
    pub health: String,
    pub trend: Vec<TrendBucketResponse>,
}

impl From<AuditAnalytics> for AuditAnalyticsResponse {
    fn from(value: AuditAnalytics) -> Self {
        Self {
            range: value.range.as_str().to_owned(),
            sampled_events: value.sampled_events,
            hourly_activity: value.hourly_activity.to_vec(),
            peak_hour: value.peak_hour,
            weekday_activity: value.weekday_activity.to_vec(),
            peak_weekday: value.peak_weekday,
            top_actions: value
                .top_actions
                .into_iter()
                .map(ActionCountResponse::from)
                .collect(),
            top_actors: value
                .top_actors
                .into_iter()
                .map(ActorCountResponse::from)
                .collect(),
            security_events: value.security_events,
            error_events: value.error_events,
            error_rate: value.error_rate,
            health: value.health.as_str().to_owned(),
            trend: value
                .trend
                .into_iter()
                .map(TrendBucketResponse::from)
                .collect(),
        }
    }
}
