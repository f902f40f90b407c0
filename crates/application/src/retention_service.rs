use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use auditra_core::{AppError, AppResult, UserIdentity};
use auditra_domain::{AuditEvent, EventDetails, NewAuditEventInput, Permission};

use crate::authorization_service::AuthorizationService;
use crate::event_store::AuditEventStore;

mod compression;
mod deletion;
#[cfg(test)]
mod tests;

/// Action recorded for a completed cleanup run.
const CLEANUP_COMPLETED_ACTION: &str = "retention_cleanup";
/// Action recorded when a cleanup run aborts.
const CLEANUP_FAILED_ACTION: &str = "retention_cleanup_failed";
/// Actor recorded for runs without a human trigger.
const SYSTEM_ACTOR: &str = "system";

/// Safety ceilings and page sizes for cleanup runs.
///
/// Compression is bounded by a per-tier page ceiling, deletion by a per-tier
/// document cap; whatever remains eligible is picked up by the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupLimits {
    /// Page size for scheduled runs.
    pub page_size: usize,
    /// Reduced page size for manually triggered runs.
    pub manual_page_size: usize,
    /// Maximum pages the compression stage commits per tier per run.
    pub max_pages_per_tier: u32,
    /// Maximum documents the deletion stage removes per tier per run.
    pub max_documents_per_tier: u64,
}

impl Default for CleanupLimits {
    fn default() -> Self {
        Self {
            page_size: 100,
            manual_page_size: 50,
            max_pages_per_tier: 1,
            max_documents_per_tier: 1_000,
        }
    }
}

/// How a cleanup run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTrigger {
    /// Recurring run started by the worker schedule.
    Scheduled,
    /// Run started by an administrator through the API.
    Manual,
}

impl CleanupTrigger {
    /// Returns a stable storage value for this trigger.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}

/// Result of one compression stage invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionOutcome {
    /// Events matched by the compression scan.
    pub scanned: u64,
    /// Events rewritten to the compressed projection.
    pub compressed: u64,
    /// Pages committed.
    pub batches: u64,
}

/// Result of one deletion stage invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    /// Events permanently removed.
    pub deleted: u64,
    /// Pages committed.
    pub batches: u64,
}

/// Accumulated statistics for one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// How the run was started.
    pub trigger: CleanupTrigger,
    /// Events matched by the compression scan.
    pub scanned: u64,
    /// Events rewritten to the compressed projection.
    pub compressed: u64,
    /// Events permanently removed.
    pub deleted: u64,
    /// Unhandled failures during the run.
    pub errors: u64,
    /// Pages committed across both stages.
    pub batches: u64,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end of the run.
    pub finished_at: DateTime<Utc>,
}

impl CleanupReport {
    fn started(trigger: CleanupTrigger, at: DateTime<Utc>) -> Self {
        Self {
            trigger,
            scanned: 0,
            compressed: 0,
            deleted: 0,
            errors: 0,
            batches: 0,
            started_at: at,
            finished_at: at,
        }
    }

    /// Returns the run duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Result returned to the administrator who triggered a manual run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualCleanupOutcome {
    /// Human-readable run summary.
    pub message: String,
    /// Raw run statistics.
    pub report: CleanupReport,
}

/// Application service orchestrating audit log retention cleanup.
///
/// A run executes the compression stage, then the deletion stage, then writes
/// a run-summary event back into the store. Runs are not mutually excluded
/// across invocations; page commits are atomic in the store, so a concurrent
/// run at worst finds an already-consumed page empty.
#[derive(Clone)]
pub struct RetentionService {
    store: Arc<dyn AuditEventStore>,
    authorization_service: AuthorizationService,
    limits: CleanupLimits,
}

impl RetentionService {
    /// Creates a new service with default cleanup limits.
    #[must_use]
    pub fn new(store: Arc<dyn AuditEventStore>, authorization_service: AuthorizationService) -> Self {
        Self::with_limits(store, authorization_service, CleanupLimits::default())
    }

    /// Creates a new service with explicit cleanup limits.
    #[must_use]
    pub fn with_limits(
        store: Arc<dyn AuditEventStore>,
        authorization_service: AuthorizationService,
        limits: CleanupLimits,
    ) -> Self {
        Self {
            store,
            authorization_service,
            limits,
        }
    }

    /// Runs a scheduled cleanup with the default page size.
    ///
    /// Requires no caller identity; the summary event is attributed to the
    /// system actor. A failed run records a failure summary and returns the
    /// error without retrying.
    pub async fn run_scheduled_cleanup(&self) -> AppResult<CleanupReport> {
        self.run_at(
            CleanupTrigger::Scheduled,
            None,
            Utc::now(),
            self.limits.page_size,
        )
        .await
    }

    /// Runs a manual cleanup on behalf of an administrator.
    ///
    /// Validates the retention-run capability before touching the store, uses
    /// the reduced manual page size, and stamps the summary event with the
    /// actor's identity.
    pub async fn run_manual_cleanup(
        &self,
        actor: &UserIdentity,
    ) -> AppResult<ManualCleanupOutcome> {
        self.authorization_service
            .require_permission(actor.subject(), Permission::SecurityRetentionRun)
            .await?;

        let report = self
            .run_at(
                CleanupTrigger::Manual,
                Some(actor),
                Utc::now(),
                self.limits.manual_page_size,
            )
            .await?;

        Ok(ManualCleanupOutcome {
            message: format!(
                "Retention cleanup finished: {} events compressed, {} events deleted in {} batches.",
                report.compressed, report.deleted, report.batches
            ),
            report,
        })
    }

    async fn run_at(
        &self,
        trigger: CleanupTrigger,
        actor: Option<&UserIdentity>,
        now: DateTime<Utc>,
        page_size: usize,
    ) -> AppResult<CleanupReport> {
        let mut report = CleanupReport::started(trigger, Utc::now());
        let mut compression = CompressionOutcome::default();
        let mut deletion = DeletionOutcome::default();

        let outcome = match self.compress_into(&mut compression, now, page_size).await {
            Ok(()) => self.delete_into(&mut deletion, now, page_size).await,
            Err(error) => Err(error),
        };

        report.scanned = compression.scanned;
        report.compressed = compression.compressed;
        report.deleted = deletion.deleted;
        report.batches = compression.batches + deletion.batches;
        report.finished_at = Utc::now();

        match outcome {
            Ok(()) => {
                self.append_run_summary(actor, &report, None).await?;
                Ok(report)
            }
            Err(error) => {
                report.errors += 1;
                // The failure summary is best effort; a second store failure
                // must not mask the original error.
                self.append_run_summary(actor, &report, Some(&error))
                    .await
                    .ok();
                Err(error)
            }
        }
    }

    async fn append_run_summary(
        &self,
        actor: Option<&UserIdentity>,
        report: &CleanupReport,
        error: Option<&AppError>,
    ) -> AppResult<Uuid> {
        let action = if error.is_some() {
            CLEANUP_FAILED_ACTION
        } else {
            CLEANUP_COMPLETED_ACTION
        };

        let mut details = vec![
            ("trigger".to_owned(), json!(report.trigger.as_str())),
            ("scanned".to_owned(), json!(report.scanned)),
            ("compressed".to_owned(), json!(report.compressed)),
            ("deleted".to_owned(), json!(report.deleted)),
            ("errors".to_owned(), json!(report.errors)),
            ("batches".to_owned(), json!(report.batches)),
            ("duration_ms".to_owned(), json!(report.duration_ms())),
        ];
        if let Some(error) = error {
            details.push(("error".to_owned(), json!(error.to_string())));
        }

        let input = NewAuditEventInput {
            action: action.to_owned(),
            actor_id: actor
                .map(|actor| actor.subject().to_owned())
                .unwrap_or_else(|| SYSTEM_ACTOR.to_owned()),
            actor_email: actor.and_then(|actor| actor.email().map(str::to_owned)),
            target_id: None,
            details: EventDetails::new(details),
        };

        self.store
            .append(AuditEvent::record(input, report.finished_at))
            .await
    }
}
