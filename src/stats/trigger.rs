use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use rand::Rng;
use strum::IntoEnumIterator;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    aggregator::CareerAggregator, leaderboard::LeaderboardBuilder, repository::StatsRepository,
    CareerAggregate, LeaderboardCategory, StatsError,
};

/// Retry policy for the recompute that follows a committed write.
#[derive(Debug, Clone, Copy)]
pub struct RecomputePolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RecomputePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(25),
        }
    }
}

impl RecomputePolicy {
    /// Exponential backoff with up to 100% jitter for the given retry (1-based).
    fn backoff(&self, retry: u32) -> Duration {
        let base = self.base_backoff.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << retry.saturating_sub(1).min(16));
        let jitter = if exp > 0 {
            rand::rng().random_range(0..=exp)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}

/// Binds writes to career recomputes and leaderboard reads to rebuilds.
///
/// Never applies deltas: every run rebuilds the derived view in full.
pub struct RecomputeTrigger {
    aggregator: CareerAggregator,
    leaderboards: LeaderboardBuilder,
    policy: RecomputePolicy,
}

impl RecomputeTrigger {
    pub fn new(repository: Arc<dyn StatsRepository>, policy: RecomputePolicy) -> Self {
        Self {
            aggregator: CareerAggregator::new(repository.clone()),
            leaderboards: LeaderboardBuilder::new(repository),
            policy,
        }
    }

    pub fn leaderboards(&self) -> &LeaderboardBuilder {
        &self.leaderboards
    }

    /// Recompute requested directly by a caller. Storage errors propagate as-is.
    pub async fn recompute_player(&self, player_id: Uuid) -> Result<CareerAggregate, StatsError> {
        self.aggregator.recompute(player_id).await
    }

    /// Runs after a performance write has committed.
    ///
    /// Retries per the policy. When every attempt fails the write stays
    /// committed and the caller receives `StatsError::Consistency`.
    #[instrument(skip(self))]
    pub async fn performance_written(
        &self,
        player_id: Uuid,
    ) -> Result<CareerAggregate, StatsError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.aggregator.recompute(player_id).await {
                Ok(aggregate) => return Ok(aggregate),
                Err(err) => {
                    warn!(%player_id, attempt, attempts, error = %err, "Career recompute failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }

        let reason = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "recompute did not run".to_string());
        error!(%player_id, %reason, "Career stats left stale after committed write");
        Err(StatsError::Consistency { player_id, reason })
    }

    /// Rebuilds one partition ahead of a read.
    pub async fn leaderboard_requested(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
    ) -> Result<usize, StatsError> {
        self.leaderboards.refresh(category, season).await
    }

    /// Rebuilds every category for `season`, categories in parallel.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self, season: Option<&str>) -> Result<(), StatsError> {
        let refreshes = LeaderboardCategory::iter()
            .map(|category| async move {
                self.leaderboards
                    .refresh(category, season)
                    .await
                    .map(|ranked| (category, ranked))
            });
        let results = try_join_all(refreshes).await?;

        for (category, ranked) in results {
            info!(%category, ranked, "Leaderboard refreshed");
        }
        Ok(())
    }
}
