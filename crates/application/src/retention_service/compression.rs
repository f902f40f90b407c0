use super::*;

use chrono::Duration;

use auditra_domain::{COMPRESSIBLE_TIERS, FULL_DETAIL_RETENTION_DAYS};

use crate::event_store::{EventCursor, PageRequest, StoredAuditEvent};

impl RetentionService {
    /// Compresses events that have aged past the full-detail window.
    ///
    /// Scans the compressible tiers for events recorded before the global
    /// 90-day cutoff, ascending by write timestamp, and rewrites each page to
    /// the compressed projection as one atomic batch. Records already in the
    /// compressed pseudo-tier never match the scan, so reruns are idempotent.
    pub async fn compress_aged_events(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<CompressionOutcome> {
        let mut outcome = CompressionOutcome::default();
        self.compress_into(&mut outcome, now, self.limits.page_size)
            .await?;
        Ok(outcome)
    }

    pub(super) async fn compress_into(
        &self,
        outcome: &mut CompressionOutcome,
        now: DateTime<Utc>,
        page_size: usize,
    ) -> AppResult<()> {
        let cutoff = now - Duration::days(FULL_DETAIL_RETENTION_DAYS);

        for tier in COMPRESSIBLE_TIERS {
            let mut cursor: Option<EventCursor> = None;
            let mut pages: u32 = 0;

            while pages < self.limits.max_pages_per_tier {
                let page = self
                    .store
                    .page_tier_older_than(
                        tier,
                        cutoff,
                        PageRequest {
                            limit: page_size,
                            start_after: cursor,
                        },
                    )
                    .await?;

                if page.is_empty() {
                    break;
                }

                let matched = page.len() as u64;
                cursor = page.last().map(StoredAuditEvent::cursor);

                let rewrites = page
                    .into_iter()
                    .map(|stored| StoredAuditEvent {
                        event_id: stored.event_id,
                        event: stored.event.into_compressed(now),
                    })
                    .collect();
                self.store.commit_compressed(rewrites).await?;

                outcome.scanned += matched;
                outcome.compressed += matched;
                outcome.batches += 1;
                pages += 1;
            }
        }

        Ok(())
    }
}
