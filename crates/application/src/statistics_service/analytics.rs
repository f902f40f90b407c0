use super::*;

use std::collections::HashMap;

use chrono::{Datelike, Timelike};

use crate::event_store::RecentEventsQuery;

/// Substrings marking an action as security relevant for reporting.
const SECURITY_ACTION_MARKERS: &[&str] =
    &["security", "unauthorized", "failed", "permission_denied"];

/// Substrings marking an action as a failure for the error rate.
const ERROR_ACTION_MARKERS: &[&str] = &["failed", "error"];

/// Buckets in the activity trend, oldest to newest.
const TREND_BUCKETS: usize = 10;

/// Entries kept in the top-actions and top-actors lists.
const TOP_ENTRY_LIMIT: usize = 10;

/// Filter options for one analytics report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsQuery {
    /// Time range to report over.
    pub range: AnalyticsRange,
    /// Optional exact action filter.
    pub action: Option<String>,
    /// Optional exact actor filter.
    pub actor_id: Option<String>,
}

/// Action frequency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCount {
    /// Action identifier.
    pub action: String,
    /// Matching events in the sample.
    pub events: u64,
}

/// Actor activity entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorCount {
    /// Actor identifier.
    pub actor_id: String,
    /// Matching events in the sample.
    pub events: u64,
}

/// One bucket of the activity trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendBucket {
    /// Start of the bucket window.
    pub bucket_start: DateTime<Utc>,
    /// Events recorded within the bucket.
    pub events: u64,
}

/// Error-rate classification of recent activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityHealth {
    /// Less than 5% of sampled events are failures.
    Healthy,
    /// Less than 10% of sampled events are failures.
    Warning,
    /// 10% or more of sampled events are failures.
    Critical,
}

impl ActivityHealth {
    /// Returns a stable storage value for this label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Activity report over a sampled window of recent events.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditAnalytics {
    /// Reported time range.
    pub range: AnalyticsRange,
    /// Events in the sample (capped at the fetch limit).
    pub sampled_events: u64,
    /// Events per hour of day.
    pub hourly_activity: [u64; 24],
    /// Hour of day with the most events.
    pub peak_hour: u8,
    /// Events per weekday, Monday first.
    pub weekday_activity: [u64; 7],
    /// Weekday with the most events, Monday first.
    pub peak_weekday: u8,
    /// Most frequent actions, descending.
    pub top_actions: Vec<ActionCount>,
    /// Most active actors, descending.
    pub top_actors: Vec<ActorCount>,
    /// Events matching the security marker list.
    pub security_events: u64,
    /// Events matching the error marker list.
    pub error_events: u64,
    /// Share of sampled events that are failures.
    pub error_rate: f64,
    /// Error-rate classification.
    pub health: ActivityHealth,
    /// Activity trend, oldest bucket first.
    pub trend: Vec<TrendBucket>,
}

impl StatisticsService {
    /// Returns the activity analytics report for audit-viewing users.
    pub async fn audit_analytics(
        &self,
        actor: &UserIdentity,
        query: AnalyticsQuery,
    ) -> AppResult<AuditAnalytics> {
        self.authorization_service
            .require_permission(actor.subject(), Permission::SecurityAuditRead)
            .await?;

        self.compute_audit_analytics(query, Utc::now()).await
    }

    pub(crate) async fn compute_audit_analytics(
        &self,
        query: AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> AppResult<AuditAnalytics> {
        let since = now - Duration::days(query.range.days());
        let sample = self
            .store
            .list_recent(RecentEventsQuery {
                since,
                action: query.action.clone(),
                actor_id: query.actor_id.clone(),
                limit: ANALYTICS_FETCH_LIMIT,
            })
            .await?;

        let mut hourly_activity = [0_u64; 24];
        let mut weekday_activity = [0_u64; 7];
        let mut action_counts: HashMap<String, u64> = HashMap::new();
        let mut actor_counts: HashMap<String, u64> = HashMap::new();
        let mut security_events = 0_u64;
        let mut error_events = 0_u64;
        let mut trend_counts = [0_u64; TREND_BUCKETS];
        let bucket_width = Duration::days(query.range.days()) / TREND_BUCKETS as i32;

        for stored in &sample {
            let event = &stored.event;
            hourly_activity[event.recorded_at.hour() as usize % 24] += 1;
            weekday_activity[event.recorded_at.weekday().num_days_from_monday() as usize % 7] += 1;

            *action_counts.entry(event.action.clone()).or_insert(0) += 1;
            *actor_counts.entry(event.actor_id.clone()).or_insert(0) += 1;

            if SECURITY_ACTION_MARKERS
                .iter()
                .any(|marker| event.action.contains(marker))
            {
                security_events += 1;
            }
            if ERROR_ACTION_MARKERS
                .iter()
                .any(|marker| event.action.contains(marker))
            {
                error_events += 1;
            }

            trend_counts[trend_bucket_index(event.recorded_at, since, bucket_width)] += 1;
        }

        let sampled_events = sample.len() as u64;
        let error_rate = ratio(error_events, sampled_events);

        Ok(AuditAnalytics {
            range: query.range,
            sampled_events,
            hourly_activity,
            peak_hour: peak_index(&hourly_activity),
            weekday_activity,
            peak_weekday: peak_index(&weekday_activity),
            top_actions: top_entries(action_counts)
                .into_iter()
                .map(|(action, events)| ActionCount { action, events })
                .collect(),
            top_actors: top_entries(actor_counts)
                .into_iter()
                .map(|(actor_id, events)| ActorCount { actor_id, events })
                .collect(),
            security_events,
            error_events,
            error_rate,
            health: activity_health(error_rate),
            trend: (0..TREND_BUCKETS)
                .map(|index| TrendBucket {
                    bucket_start: since + bucket_width * index as i32,
                    events: trend_counts[index],
                })
                .collect(),
        })
    }
}

fn trend_bucket_index(
    recorded_at: DateTime<Utc>,
    since: DateTime<Utc>,
    bucket_width: Duration,
) -> usize {
    if bucket_width <= Duration::zero() {
        return 0;
    }

    let elapsed = (recorded_at - since).num_seconds().max(0);
    let index = elapsed / bucket_width.num_seconds().max(1);
    usize::try_from(index).unwrap_or(0).min(TREND_BUCKETS - 1)
}

fn peak_index(counts: &[u64]) -> u8 {
    counts
        .iter()
        .enumerate()
        .max_by_key(|(index, count)| (**count, std::cmp::Reverse(*index)))
        .map(|(index, _)| index as u8)
        .unwrap_or(0)
}

fn top_entries(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    entries.truncate(TOP_ENTRY_LIMIT);
    entries
}

fn activity_health(error_rate: f64) -> ActivityHealth {
    if error_rate < 0.05 {
        ActivityHealth::Healthy
    } else if error_rate < 0.10 {
        ActivityHealth::Warning
    } else {
        ActivityHealth::Critical
    }
}
