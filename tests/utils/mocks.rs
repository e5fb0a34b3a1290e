use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use cricket_stats::stats::{
    validation::PerformancePatch, CareerAggregate, InMemoryStatsRepository, LeaderboardCategory,
    LeaderboardEntry, PerformanceFact, PerformanceFilters, StatsError, StatsRepository,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// In-memory store whose career writes fail a configurable number of times.
#[derive(Clone)]
pub struct FlakyStatsRepository {
    inner: Arc<InMemoryStatsRepository>,
    remaining_failures: Arc<AtomicU32>,
    career_writes: Arc<AtomicU32>,
}

impl FlakyStatsRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryStatsRepository::new()),
            remaining_failures: Arc::new(AtomicU32::new(0)),
            career_writes: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The next `count` career writes fail.
    pub fn fail_next_career_writes(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::SeqCst);
    }

    /// Attempted career writes, failed ones included.
    pub fn career_write_attempts(&self) -> u32 {
        self.career_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsRepository for FlakyStatsRepository {
    async fn insert_performance(
        &self,
        fact: PerformanceFact,
    ) -> Result<PerformanceFact, StatsError> {
        self.inner.insert_performance(fact).await
    }

    async fn get_performance(&self, id: Uuid) -> Result<Option<PerformanceFact>, StatsError> {
        self.inner.get_performance(id).await
    }

    async fn get_performance_by_player_match(
        &self,
        player_id: Uuid,
        match_id: Uuid,
    ) -> Result<Option<PerformanceFact>, StatsError> {
        self.inner
            .get_performance_by_player_match(player_id, match_id)
            .await
    }

    async fn update_performance(
        &self,
        id: Uuid,
        patch: &PerformancePatch,
    ) -> Result<PerformanceFact, StatsError> {
        self.inner.update_performance(id, patch).await
    }

    async fn delete_performance(&self, id: Uuid) -> Result<PerformanceFact, StatsError> {
        self.inner.delete_performance(id).await
    }

    async fn list_performances(
        &self,
        filters: &PerformanceFilters,
    ) -> Result<(Vec<PerformanceFact>, u64), StatsError> {
        self.inner.list_performances(filters).await
    }

    async fn list_player_performances(
        &self,
        player_id: Uuid,
    ) -> Result<Vec<PerformanceFact>, StatsError> {
        self.inner.list_player_performances(player_id).await
    }

    async fn get_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<Option<CareerAggregate>, StatsError> {
        self.inner.get_career_aggregate(player_id).await
    }

    async fn get_or_init_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<CareerAggregate, StatsError> {
        self.inner.get_or_init_career_aggregate(player_id).await
    }

    async fn replace_career_aggregate(
        &self,
        aggregate: CareerAggregate,
    ) -> Result<(), StatsError> {
        self.career_writes.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StatsError::Repository("connection reset".to_string()));
        }
        self.inner.replace_career_aggregate(aggregate).await
    }

    async fn list_career_aggregates(&self) -> Result<Vec<CareerAggregate>, StatsError> {
        self.inner.list_career_aggregates().await
    }

    async fn replace_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        entries: Vec<LeaderboardEntry>,
    ) -> Result<(), StatsError> {
        self.inner.replace_leaderboard(category, season, entries).await
    }

    async fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        self.inner.get_leaderboard(category, season, limit).await
    }
}
