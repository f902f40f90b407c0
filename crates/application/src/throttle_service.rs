//! Action throttling ports and application service.
//!
//! A sliding-window throttle keyed by actor and action. The window state
//! lives behind a repository port so single-instance deployments can use the
//! in-memory implementation while multi-instance deployments swap in a shared
//! store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use auditra_core::{AppError, AppResult};

/// Repository port for throttle window persistence.
#[async_trait]
pub trait ThrottleRepository: Send + Sync {
    /// Records an attempt under `key` and returns the number of attempts
    /// within the window ending at `now`, including this one.
    async fn record_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window_seconds: i64,
    ) -> AppResult<u32>;

    /// Removes window state idle since before the given cutoff.
    async fn prune_idle(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Configuration for one throttled action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleRule {
    /// The throttled action name (e.g. "retention_cleanup").
    pub action: String,
    /// Maximum attempts allowed in the window.
    pub max_attempts: u32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl ThrottleRule {
    /// Creates a new throttle rule.
    #[must_use]
    pub fn new(action: impl Into<String>, max_attempts: u32, window_seconds: i64) -> Self {
        Self {
            action: action.into(),
            max_attempts,
            window_seconds,
        }
    }
}

/// Application service for per-actor action throttling.
#[derive(Clone)]
pub struct ThrottleService {
    repository: Arc<dyn ThrottleRepository>,
}

impl ThrottleService {
    /// Creates a new throttle service.
    #[must_use]
    pub fn new(repository: Arc<dyn ThrottleRepository>) -> Self {
        Self { repository }
    }

    /// Records an attempt and rejects it once the rule's limit is exceeded.
    pub async fn check_attempt(&self, rule: &ThrottleRule, actor_id: &str) -> AppResult<()> {
        let key = format!("{}:{actor_id}", rule.action);
        let attempts = self
            .repository
            .record_attempt(&key, Utc::now(), rule.window_seconds)
            .await?;

        if attempts > rule.max_attempts {
            return Err(AppError::RateLimited(
                "too many requests, please try again later".to_owned(),
            ));
        }

        Ok(())
    }

    /// Removes idle throttle state. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::hours(24);
        self.repository.prune_idle(cutoff).await
    }
}
