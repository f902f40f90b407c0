use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use auditra_application::ThrottleRepository;
use auditra_core::AppResult;

/// Upper bound on tracked throttle keys. When reached, the key with the
/// oldest latest attempt is evicted to make room.
const MAX_TRACKED_KEYS: usize = 10_000;

/// In-memory sliding-window throttle state for single-instance deployments.
#[derive(Default)]
pub struct InMemoryThrottleRepository {
    windows: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryThrottleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThrottleRepository for InMemoryThrottleRepository {
    async fn record_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window_seconds: i64,
    ) -> AppResult<u32> {
        let mut windows = self.windows.write().await;

        if !windows.contains_key(key) && windows.len() >= MAX_TRACKED_KEYS {
            let evict = windows
                .iter()
                .min_by_key(|(_, attempts)| attempts.last().copied())
                .map(|(stale_key, _)| stale_key.clone());
            if let Some(stale_key) = evict {
                windows.remove(&stale_key);
            }
        }

        let window_start = now - Duration::seconds(window_seconds);
        let attempts = windows.entry(key.to_owned()).or_default();
        attempts.retain(|attempt| *attempt > window_start);
        attempts.push(now);

        Ok(attempts.len() as u32)
    }

    async fn prune_idle(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut windows = self.windows.write().await;
        let before_len = windows.len();
        windows.retain(|_, attempts| attempts.last().is_some_and(|last| *last >= before));
        Ok((before_len - windows.len()) as u64)
    }
}
