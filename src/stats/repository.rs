use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    validation::PerformancePatch, CareerAggregate, LeaderboardCategory, LeaderboardEntry,
    PerformanceFact, PerformanceFilters, StatsError, ALL_TIME_SEASON,
};

/// Storage for performance facts and the two views derived from them.
///
/// Implementations must make `replace_career_aggregate` a single-row atomic
/// upsert and `replace_leaderboard` an all-or-nothing swap of the partition.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Inserts a fact. Fails with `Conflict` if the (player, match) pair exists.
    async fn insert_performance(&self, fact: PerformanceFact)
        -> Result<PerformanceFact, StatsError>;
    async fn get_performance(&self, id: Uuid) -> Result<Option<PerformanceFact>, StatsError>;
    async fn get_performance_by_player_match(
        &self,
        player_id: Uuid,
        match_id: Uuid,
    ) -> Result<Option<PerformanceFact>, StatsError>;
    /// Applies `patch` to the stored fact atomically and returns the result.
    async fn update_performance(
        &self,
        id: Uuid,
        patch: &PerformancePatch,
    ) -> Result<PerformanceFact, StatsError>;
    /// Removes a fact and returns it so the caller knows whose stats changed.
    async fn delete_performance(&self, id: Uuid) -> Result<PerformanceFact, StatsError>;
    async fn list_performances(
        &self,
        filters: &PerformanceFilters,
    ) -> Result<(Vec<PerformanceFact>, u64), StatsError>;
    async fn list_player_performances(
        &self,
        player_id: Uuid,
    ) -> Result<Vec<PerformanceFact>, StatsError>;

    async fn get_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<Option<CareerAggregate>, StatsError>;
    /// Returns the stored aggregate, inserting a zero one if none exists.
    /// Never overwrites an existing row.
    async fn get_or_init_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<CareerAggregate, StatsError>;
    async fn replace_career_aggregate(&self, aggregate: CareerAggregate)
        -> Result<(), StatsError>;
    async fn list_career_aggregates(&self) -> Result<Vec<CareerAggregate>, StatsError>;

    async fn replace_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        entries: Vec<LeaderboardEntry>,
    ) -> Result<(), StatsError>;
    async fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StatsError>;
}

#[derive(Debug, Default)]
struct PerformanceTable {
    by_id: HashMap<Uuid, PerformanceFact>,
    by_player_match: HashMap<(Uuid, Uuid), Uuid>,
}

type LeaderboardKey = (LeaderboardCategory, String);

fn leaderboard_key(category: LeaderboardCategory, season: Option<&str>) -> LeaderboardKey {
    (category, season.unwrap_or(ALL_TIME_SEASON).to_string())
}

/// In-memory implementation of StatsRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    performances: Arc<RwLock<PerformanceTable>>,
    career_stats: Arc<RwLock<HashMap<Uuid, CareerAggregate>>>,
    leaderboards: Arc<RwLock<HashMap<LeaderboardKey, Vec<LeaderboardEntry>>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    #[instrument(skip(self, fact), fields(player_id = %fact.player_id, match_id = %fact.match_id))]
    async fn insert_performance(
        &self,
        fact: PerformanceFact,
    ) -> Result<PerformanceFact, StatsError> {
        let mut table = self.performances.write().await;
        let pair = (fact.player_id, fact.match_id);
        if table.by_player_match.contains_key(&pair) {
            warn!("Performance already exists in memory");
            return Err(StatsError::Conflict {
                player_id: fact.player_id,
                match_id: fact.match_id,
            });
        }

        table.by_player_match.insert(pair, fact.id);
        table.by_id.insert(fact.id, fact.clone());

        debug!(performance_id = %fact.id, "Performance stored in memory");
        Ok(fact)
    }

    async fn get_performance(&self, id: Uuid) -> Result<Option<PerformanceFact>, StatsError> {
        let table = self.performances.read().await;
        Ok(table.by_id.get(&id).cloned())
    }

    async fn get_performance_by_player_match(
        &self,
        player_id: Uuid,
        match_id: Uuid,
    ) -> Result<Option<PerformanceFact>, StatsError> {
        let table = self.performances.read().await;
        Ok(table
            .by_player_match
            .get(&(player_id, match_id))
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    #[instrument(skip(self, patch))]
    async fn update_performance(
        &self,
        id: Uuid,
        patch: &PerformancePatch,
    ) -> Result<PerformanceFact, StatsError> {
        let mut table = self.performances.write().await;
        let fact = table
            .by_id
            .get_mut(&id)
            .ok_or_else(|| StatsError::performance_not_found(id))?;

        patch.apply(fact);

        debug!(performance_id = %id, "Performance updated in memory");
        Ok(fact.clone())
    }

    #[instrument(skip(self))]
    async fn delete_performance(&self, id: Uuid) -> Result<PerformanceFact, StatsError> {
        let mut table = self.performances.write().await;
        let fact = table
            .by_id
            .remove(&id)
            .ok_or_else(|| StatsError::performance_not_found(id))?;
        table
            .by_player_match
            .remove(&(fact.player_id, fact.match_id));

        debug!(performance_id = %id, "Performance deleted from memory");
        Ok(fact)
    }

    async fn list_performances(
        &self,
        filters: &PerformanceFilters,
    ) -> Result<(Vec<PerformanceFact>, u64), StatsError> {
        let table = self.performances.read().await;
        let mut matching: Vec<&PerformanceFact> = table
            .by_id
            .values()
            .filter(|fact| filters.matches(fact))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let (_, limit) = filters.pagination();
        let page = matching
            .into_iter()
            .skip(filters.offset() as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn list_player_performances(
        &self,
        player_id: Uuid,
    ) -> Result<Vec<PerformanceFact>, StatsError> {
        let table = self.performances.read().await;
        Ok(table
            .by_id
            .values()
            .filter(|fact| fact.player_id == player_id)
            .cloned()
            .collect())
    }

    async fn get_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<Option<CareerAggregate>, StatsError> {
        let stats = self.career_stats.read().await;
        Ok(stats.get(&player_id).cloned())
    }

    async fn get_or_init_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<CareerAggregate, StatsError> {
        let mut stats = self.career_stats.write().await;
        Ok(stats
            .entry(player_id)
            .or_insert_with(|| CareerAggregate::zero(player_id))
            .clone())
    }

    async fn replace_career_aggregate(
        &self,
        aggregate: CareerAggregate,
    ) -> Result<(), StatsError> {
        let mut stats = self.career_stats.write().await;
        stats.insert(aggregate.player_id, aggregate);
        Ok(())
    }

    async fn list_career_aggregates(&self) -> Result<Vec<CareerAggregate>, StatsError> {
        let stats = self.career_stats.read().await;
        Ok(stats.values().cloned().collect())
    }

    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    async fn replace_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        entries: Vec<LeaderboardEntry>,
    ) -> Result<(), StatsError> {
        let mut boards = self.leaderboards.write().await;
        boards.insert(leaderboard_key(category, season), entries);
        debug!(%category, "Leaderboard partition replaced in memory");
        Ok(())
    }

    async fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let boards = self.leaderboards.read().await;
        Ok(boards
            .get(&leaderboard_key(category, season))
            .map(|entries| entries.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
