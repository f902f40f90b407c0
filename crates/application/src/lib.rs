//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_trail_service;
mod authorization_service;
mod event_store;
mod retention_service;
mod statistics_service;
#[cfg(test)]
mod test_support;
mod throttle_service;

pub use audit_trail_service::{AuditTrailService, RecordEventRequest};
pub use authorization_service::{AuthorizationRepository, AuthorizationService};
pub use event_store::{
    AuditEventStore, EventCursor, PageRequest, RecentEventsQuery, StoredAuditEvent,
};
pub use retention_service::{
    CleanupLimits, CleanupReport, CleanupTrigger, CompressionOutcome, DeletionOutcome,
    ManualCleanupOutcome, RetentionService,
};
pub use statistics_service::{
    ANALYTICS_FETCH_LIMIT, ActionCount, ActivityHealth, ActorCount, AnalyticsQuery,
    AnalyticsRange, AuditAnalytics, GrowthProjection, RetentionStats, StatisticsService,
    StoreHealth, TierUsage, TrendBucket,
};
pub use throttle_service::{ThrottleRepository, ThrottleRule, ThrottleService};
