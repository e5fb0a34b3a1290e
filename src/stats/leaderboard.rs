use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, instrument};

use super::{
    models::season_partition, repository::StatsRepository, CareerAggregate, LeaderboardCategory,
    LeaderboardEntry, SortDirection, StatsError,
};

/// Innings or wickets a player needs before rate-based categories rank them.
pub const QUALIFYING_INNINGS: i32 = 5;
pub const QUALIFYING_WICKETS: i32 = 5;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

impl LeaderboardCategory {
    pub fn direction(&self) -> SortDirection {
        match self {
            LeaderboardCategory::BestBowlingAverage | LeaderboardCategory::BestEconomy => {
                SortDirection::Ascending
            }
            _ => SortDirection::Descending,
        }
    }

    pub fn value(&self, aggregate: &CareerAggregate) -> f64 {
        match self {
            LeaderboardCategory::MostRuns => f64::from(aggregate.total_runs),
            LeaderboardCategory::MostWickets => f64::from(aggregate.total_wickets),
            LeaderboardCategory::BestBattingAverage => aggregate.batting_average,
            LeaderboardCategory::BestBowlingAverage => aggregate.bowling_average,
            LeaderboardCategory::BestStrikeRate => aggregate.batting_strike_rate,
            LeaderboardCategory::BestEconomy => aggregate.bowling_economy,
        }
    }

    /// Every category requires a positive value; rate categories also need a
    /// minimum sample.
    pub fn qualifies(&self, aggregate: &CareerAggregate) -> bool {
        let floor = match self {
            LeaderboardCategory::MostRuns | LeaderboardCategory::MostWickets => true,
            LeaderboardCategory::BestBattingAverage | LeaderboardCategory::BestStrikeRate => {
                aggregate.total_innings >= QUALIFYING_INNINGS
            }
            LeaderboardCategory::BestBowlingAverage | LeaderboardCategory::BestEconomy => {
                aggregate.total_wickets >= QUALIFYING_WICKETS
            }
        };
        floor && self.value(aggregate) > 0.0
    }
}

/// Clamps a caller-supplied limit: non-positive means the default, anything
/// above the cap is cut to the cap.
pub fn clamp_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(limit) if limit > 0 => (limit as usize).min(MAX_LEADERBOARD_LIMIT),
        _ => DEFAULT_LEADERBOARD_LIMIT,
    }
}

/// Ranks every qualifying aggregate for `category`.
///
/// Ranks run 1..=N without gaps. Equal values are ordered by player id
/// ascending so the ranking does not depend on storage order.
pub fn rank(
    category: LeaderboardCategory,
    season: Option<&str>,
    aggregates: &[CareerAggregate],
) -> Vec<LeaderboardEntry> {
    let direction = category.direction();
    let mut qualified: Vec<(f64, &CareerAggregate)> = aggregates
        .iter()
        .filter(|a| category.qualifies(a))
        .map(|a| (category.value(a), a))
        .collect();

    qualified.sort_by(|(va, a), (vb, b)| {
        let by_value = match direction {
            SortDirection::Ascending => va.total_cmp(vb),
            SortDirection::Descending => vb.total_cmp(va),
        };
        match by_value {
            Ordering::Equal => a.player_id.cmp(&b.player_id),
            other => other,
        }
    });

    qualified
        .into_iter()
        .enumerate()
        .map(|(index, (value, aggregate))| LeaderboardEntry {
            player_id: aggregate.player_id,
            category,
            value,
            rank: index as i32 + 1,
            season: season.map(str::to_string),
        })
        .collect()
}

type PartitionKey = (LeaderboardCategory, Option<String>);

/// Rebuilds and serves leaderboard partitions.
///
/// Refreshes of one (category, season) partition are serialized; different
/// partitions refresh independently.
pub struct LeaderboardBuilder {
    repository: Arc<dyn StatsRepository>,
    partition_mutexes: Arc<RwLock<HashMap<PartitionKey, Arc<AsyncMutex<()>>>>>,
}

impl LeaderboardBuilder {
    pub fn new(repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            repository,
            partition_mutexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[instrument(skip(self))]
    pub async fn refresh(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
    ) -> Result<usize, StatsError> {
        let season = season_partition(season);
        let partition_lock = self.partition_lock(category, season).await;
        let _guard = partition_lock.lock().await;

        let aggregates = self.repository.list_career_aggregates().await?;
        let entries = rank(category, season, &aggregates);
        let ranked = entries.len();

        debug!(
            %category,
            season = season.unwrap_or(super::ALL_TIME_SEASON),
            candidates = aggregates.len(),
            ranked,
            "Replacing leaderboard partition"
        );

        self.repository
            .replace_leaderboard(category, season, entries)
            .await?;

        Ok(ranked)
    }

    pub async fn get(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        self.repository
            .get_leaderboard(
                category,
                season_partition(season),
                limit.min(MAX_LEADERBOARD_LIMIT),
            )
            .await
    }

    async fn partition_lock(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
    ) -> Arc<AsyncMutex<()>> {
        let key = (category, season.map(str::to_string));
        {
            let guard = self.partition_mutexes.read().await;
            if let Some(lock) = guard.get(&key) {
                return lock.clone();
            }
        }

        let mut guard = self.partition_mutexes.write().await;
        guard
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
