use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use auditra_core::{AppError, AppResult, UserIdentity};
use auditra_domain::{Permission, RetentionTier};

use crate::authorization_service::AuthorizationService;
use crate::event_store::AuditEventStore;

mod analytics;

pub use analytics::{
    ActionCount, ActivityHealth, ActorCount, AnalyticsQuery, AuditAnalytics, TrendBucket,
};

/// Maximum events fetched for one analytics report.
pub const ANALYTICS_FETCH_LIMIT: usize = 1_000;

/// Window for the recent-activity count.
const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Qualitative label for the state of the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    /// Low compression pressure and moderate recent activity.
    Excellent,
    /// Ordinary operating state.
    Good,
    /// More than half of the store is compressed.
    Warning,
    /// The store is dominated by compressed records.
    Poor,
}

impl StoreHealth {
    /// Returns a stable storage value for this label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Poor => "poor",
        }
    }
}

/// Time range selectable for analytics reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnalyticsRange {
    /// Last 24 hours.
    OneDay,
    /// Last 7 days.
    SevenDays,
    /// Last 30 days.
    #[default]
    ThirtyDays,
    /// Last 90 days.
    NinetyDays,
}

impl AnalyticsRange {
    /// Returns a stable transport value for this range.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::NinetyDays => "90d",
        }
    }

    /// Returns the range length in days.
    #[must_use]
    pub fn days(&self) -> i64 {
        match self {
            Self::OneDay => 1,
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
            Self::NinetyDays => 90,
        }
    }
}

impl FromStr for AnalyticsRange {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "1d" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            "90d" => Ok(Self::NinetyDays),
            _ => Err(AppError::Validation(format!(
                "unknown analytics range '{value}'"
            ))),
        }
    }
}

/// Event count and estimated footprint of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierUsage {
    /// The tier.
    pub tier: RetentionTier,
    /// Records currently in the tier.
    pub events: u64,
    /// Estimated storage footprint in bytes.
    pub estimated_bytes: u64,
}

/// Growth projection derived from the recent daily average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthProjection {
    /// Average events per day over the recent window.
    pub daily_average: f64,
    /// Projected new events over the next 30 days.
    pub next_30_days: f64,
    /// Projected new events over the next 365 days.
    pub next_365_days: f64,
}

/// Aggregate retention and storage report.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionStats {
    /// When the report was computed.
    pub generated_at: DateTime<Utc>,
    /// Total records in the store.
    pub total_events: u64,
    /// Per-tier counts and storage estimates.
    pub tiers: Vec<TierUsage>,
    /// Records in the compressed pseudo-tier.
    pub compressed_events: u64,
    /// Share of records already compressed.
    pub compression_ratio: f64,
    /// Records written in the last seven days.
    pub recent_events: u64,
    /// Estimated total storage footprint in bytes.
    pub estimated_total_bytes: u64,
    /// Qualitative health label.
    pub health: StoreHealth,
    /// Growth projection from the recent daily average.
    pub growth: GrowthProjection,
}

/// Read-only reporting service over the audit event store.
#[derive(Clone)]
pub struct StatisticsService {
    store: Arc<dyn AuditEventStore>,
    authorization_service: AuthorizationService,
}

impl StatisticsService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(store: Arc<dyn AuditEventStore>, authorization_service: AuthorizationService) -> Self {
        Self {
            store,
            authorization_service,
        }
    }

    /// Returns the aggregate retention report for audit-viewing users.
    pub async fn retention_stats(&self, actor: &UserIdentity) -> AppResult<RetentionStats> {
        self.authorization_service
            .require_permission(actor.subject(), Permission::SecurityAuditRead)
            .await?;

        self.compute_retention_stats(Utc::now()).await
    }

    pub(crate) async fn compute_retention_stats(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<RetentionStats> {
        let total_events = self.store.count_events().await?;

        let mut tiers = Vec::with_capacity(RetentionTier::all().len());
        for tier in RetentionTier::all() {
            let events = self.store.count_tier(*tier).await?;
            tiers.push(TierUsage {
                tier: *tier,
                events,
                estimated_bytes: events * estimated_event_bytes(*tier),
            });
        }

        let compressed_events = tiers
            .iter()
            .find(|usage| usage.tier == RetentionTier::Compressed)
            .map(|usage| usage.events)
            .unwrap_or(0);
        let estimated_total_bytes = tiers.iter().map(|usage| usage.estimated_bytes).sum();

        let recent_events = self
            .store
            .count_recorded_since(now - Duration::days(RECENT_ACTIVITY_DAYS))
            .await?;

        let compression_ratio = ratio(compressed_events, total_events);
        let recent_ratio = ratio(recent_events, total_events);
        let daily_average = recent_events as f64 / RECENT_ACTIVITY_DAYS as f64;

        Ok(RetentionStats {
            generated_at: now,
            total_events,
            tiers,
            compressed_events,
            compression_ratio,
            recent_events,
            estimated_total_bytes,
            health: store_health(compression_ratio, recent_ratio),
            growth: GrowthProjection {
                daily_average,
                next_30_days: daily_average * 30.0,
                next_365_days: daily_average * 365.0,
            },
        })
    }
}

/// Average serialized record size per tier, used because the store does not
/// track true per-record storage size.
fn estimated_event_bytes(tier: RetentionTier) -> u64 {
    match tier {
        RetentionTier::Compliance => 960,
        RetentionTier::Security => 720,
        RetentionTier::Standard => 540,
        RetentionTier::Operational => 420,
        RetentionTier::Compressed => 160,
    }
}

/// Derives the qualitative health label.
///
/// Branch order is load-bearing: heavy compression outranks recent activity,
/// so a store that is both heavily compressed and highly active still reports
/// `warning`.
fn store_health(compression_ratio: f64, recent_ratio: f64) -> StoreHealth {
    if compression_ratio > 0.8 {
        StoreHealth::Poor
    } else if compression_ratio > 0.5 {
        StoreHealth::Warning
    } else if recent_ratio > 0.7 {
        StoreHealth::Good
    } else if recent_ratio > 0.3 {
        StoreHealth::Excellent
    } else {
        StoreHealth::Good
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
