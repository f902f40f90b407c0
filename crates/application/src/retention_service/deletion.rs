use super::*;

use chrono::Duration;

use auditra_domain::{COMPRESSIBLE_TIERS, RETENTION_POLICIES, RetentionTier};

use crate::event_store::{EventCursor, PageRequest, StoredAuditEvent};

impl RetentionService {
    /// Permanently removes events past their tier's retention window.
    ///
    /// Compliance is structurally excluded: its records are never queried by
    /// this stage, regardless of age. Compressed records age out under the
    /// retention window of the tier they originated in. Each tier drains up
    /// to the per-tier document cap per run.
    pub async fn delete_expired_events(&self, now: DateTime<Utc>) -> AppResult<DeletionOutcome> {
        let mut outcome = DeletionOutcome::default();
        self.delete_into(&mut outcome, now, self.limits.page_size)
            .await?;
        Ok(outcome)
    }

    pub(super) async fn delete_into(
        &self,
        outcome: &mut DeletionOutcome,
        now: DateTime<Utc>,
        page_size: usize,
    ) -> AppResult<()> {
        for policy in RETENTION_POLICIES.iter().filter(|policy| policy.auto_delete) {
            let cutoff = now - Duration::days(policy.retention_days);
            let mut tier_budget = self.limits.max_documents_per_tier;

            self.delete_scan(
                DeletionScan::FullDetail(policy.tier),
                cutoff,
                page_size,
                &mut tier_budget,
                outcome,
            )
            .await?;

            if COMPRESSIBLE_TIERS.contains(&policy.tier) {
                self.delete_scan(
                    DeletionScan::CompressedFrom(policy.tier),
                    cutoff,
                    page_size,
                    &mut tier_budget,
                    outcome,
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn delete_scan(
        &self,
        scan: DeletionScan,
        cutoff: DateTime<Utc>,
        page_size: usize,
        tier_budget: &mut u64,
        outcome: &mut DeletionOutcome,
    ) -> AppResult<()> {
        let mut cursor: Option<EventCursor> = None;

        // The document budget is the binding limit here; every non-empty
        // page shrinks it, so the scan pages through the whole backlog up
        // to the cap.
        while *tier_budget > 0 {
            let limit = page_size.min(usize::try_from(*tier_budget).unwrap_or(page_size));
            let request = PageRequest {
                limit,
                start_after: cursor,
            };

            let page = match scan {
                DeletionScan::FullDetail(tier) => {
                    self.store.page_tier_older_than(tier, cutoff, request).await?
                }
                DeletionScan::CompressedFrom(origin) => {
                    self.store
                        .page_compressed_from_older_than(origin, cutoff, request)
                        .await?
                }
            };

            if page.is_empty() {
                break;
            }

            cursor = page.last().map(StoredAuditEvent::cursor);
            let event_ids: Vec<Uuid> = page.iter().map(|stored| stored.event_id).collect();
            self.store.delete_events(&event_ids).await?;

            let removed = event_ids.len() as u64;
            *tier_budget = tier_budget.saturating_sub(removed);
            outcome.deleted += removed;
            outcome.batches += 1;
        }

        Ok(())
    }
}

/// Which slice of a tier's records a deletion scan walks.
#[derive(Debug, Clone, Copy)]
enum DeletionScan {
    /// Full-detail records still in the tier.
    FullDetail(RetentionTier),
    /// Compressed records that originated in the tier.
    CompressedFrom(RetentionTier),
}
