use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    leaderboard::clamp_limit,
    repository::StatsRepository,
    trigger::{RecomputePolicy, RecomputeTrigger},
    types::{PerformanceChangeSet, PerformanceListResponse, RecordPerformanceRequest},
    validation::{validate_changes, validate_record},
    CareerAggregate, LeaderboardCategory, LeaderboardEntry, PerformanceFact, PerformanceFilters,
    StatsError,
};

/// Entry point for recording performances and reading derived statistics.
///
/// Every mutating call runs the career recompute for the affected player
/// before returning.
pub struct StatsService {
    repository: Arc<dyn StatsRepository>,
    trigger: RecomputeTrigger,
}

impl StatsService {
    pub fn builder(repository: Arc<dyn StatsRepository>) -> StatsServiceBuilder {
        StatsServiceBuilder::new(repository)
    }

    #[instrument(skip(self, request), fields(player_id = %request.player_id, match_id = %request.match_id))]
    pub async fn record_performance(
        &self,
        request: RecordPerformanceRequest,
    ) -> Result<PerformanceFact, StatsError> {
        let fact = validate_record(request).inspect_err(|err| {
            warn!(error = %err, "Rejected performance");
        })?;

        let fact = self.repository.insert_performance(fact).await?;
        self.trigger.performance_written(fact.player_id).await?;

        info!(performance_id = %fact.id, "Performance recorded");
        Ok(fact)
    }

    pub async fn get_performance(&self, id: Uuid) -> Result<PerformanceFact, StatsError> {
        self.repository
            .get_performance(id)
            .await?
            .ok_or_else(|| StatsError::performance_not_found(id))
    }

    pub async fn get_player_match_performance(
        &self,
        player_id: Uuid,
        match_id: Uuid,
    ) -> Result<PerformanceFact, StatsError> {
        self.repository
            .get_performance_by_player_match(player_id, match_id)
            .await?
            .ok_or_else(|| {
                StatsError::NotFound(format!(
                    "no performance for player {player_id} in match {match_id}"
                ))
            })
    }

    pub async fn list_performances(
        &self,
        filters: PerformanceFilters,
    ) -> Result<PerformanceListResponse, StatsError> {
        let (page, limit) = filters.pagination();
        let (performances, total) = self.repository.list_performances(&filters).await?;
        debug!(total, page, limit, "Listed performances");

        Ok(PerformanceListResponse {
            performances,
            total,
            page,
            limit,
        })
    }

    /// Applies a partial update. An empty change set returns the stored fact
    /// untouched and triggers nothing.
    #[instrument(skip(self, changes))]
    pub async fn update_performance(
        &self,
        id: Uuid,
        changes: PerformanceChangeSet,
    ) -> Result<PerformanceFact, StatsError> {
        let patch = validate_changes(&changes).inspect_err(|err| {
            warn!(error = %err, "Rejected performance update");
        })?;

        if changes.is_empty() {
            return self.get_performance(id).await;
        }

        let fact = self.repository.update_performance(id, &patch).await?;
        self.trigger.performance_written(fact.player_id).await?;

        info!(performance_id = %id, "Performance updated");
        Ok(fact)
    }

    #[instrument(skip(self))]
    pub async fn delete_performance(&self, id: Uuid) -> Result<(), StatsError> {
        let removed = self.repository.delete_performance(id).await?;
        self.trigger.performance_written(removed.player_id).await?;

        info!(performance_id = %id, player_id = %removed.player_id, "Performance deleted");
        Ok(())
    }

    /// Stored career stats; a player with none yet gets a zero row.
    pub async fn get_career_stats(&self, player_id: Uuid) -> Result<CareerAggregate, StatsError> {
        self.repository.get_or_init_career_aggregate(player_id).await
    }

    #[instrument(skip(self))]
    pub async fn refresh_career_stats(
        &self,
        player_id: Uuid,
    ) -> Result<CareerAggregate, StatsError> {
        self.trigger.recompute_player(player_id).await
    }

    /// Rebuilds the partition, then returns its top `limit` entries.
    #[instrument(skip(self))]
    pub async fn get_leaderboard(
        &self,
        category: &str,
        season: Option<&str>,
        limit: Option<i64>,
    ) -> Result<(LeaderboardCategory, Vec<LeaderboardEntry>), StatsError> {
        let category = parse_category(category)?;
        let limit = clamp_limit(limit);

        self.trigger.leaderboard_requested(category, season).await?;
        let entries = self
            .trigger
            .leaderboards()
            .get(category, season, limit)
            .await?;

        Ok((category, entries))
    }

    /// Rebuilds one partition and reports how many players it ranked.
    #[instrument(skip(self))]
    pub async fn refresh_leaderboard(
        &self,
        category: &str,
        season: Option<&str>,
    ) -> Result<(LeaderboardCategory, usize), StatsError> {
        let category = parse_category(category)?;
        let ranked = self.trigger.leaderboard_requested(category, season).await?;
        Ok((category, ranked))
    }

    pub async fn refresh_all_leaderboards(&self, season: Option<&str>) -> Result<(), StatsError> {
        self.trigger.refresh_all(season).await
    }
}

fn parse_category(raw: &str) -> Result<LeaderboardCategory, StatsError> {
    LeaderboardCategory::from_str(raw)
        .map_err(|_| StatsError::Validation(format!("unknown leaderboard category: {raw}")))
}

pub struct StatsServiceBuilder {
    repository: Arc<dyn StatsRepository>,
    policy: RecomputePolicy,
}

impl StatsServiceBuilder {
    fn new(repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            repository,
            policy: RecomputePolicy::default(),
        }
    }

    pub fn with_recompute_policy(mut self, policy: RecomputePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> StatsService {
        StatsService {
            trigger: RecomputeTrigger::new(self.repository.clone(), self.policy),
            repository: self.repository,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::record_request;
    use crate::stats::InMemoryStatsRepository;

    fn service() -> (Arc<InMemoryStatsRepository>, StatsService) {
        let repo = Arc::new(InMemoryStatsRepository::new());
        let service = StatsService::builder(repo.clone()).build();
        (repo, service)
    }

    #[tokio::test]
    async fn record_recomputes_career_stats() {
        let (_repo, service) = service();
        let player = Uuid::new_v4();
        let mut request = record_request(player, Uuid::new_v4());
        request.runs_scored = 30;
        request.balls_faced = 24;

        let fact = service.record_performance(request).await.unwrap();
        assert_eq!(fact.strike_rate, 125.0);

        let stats = service.get_career_stats(player).await.unwrap();
        assert_eq!(stats.total_runs, 30);
        assert_eq!(stats.total_innings, 1);
    }

    #[tokio::test]
    async fn duplicate_record_is_conflict_without_side_effects() {
        let (_repo, service) = service();
        let player = Uuid::new_v4();
        let match_id = Uuid::new_v4();
        let mut request = record_request(player, match_id);
        request.runs_scored = 12;
        service.record_performance(request.clone()).await.unwrap();

        request.runs_scored = 80;
        let err = service.record_performance(request).await.unwrap_err();
        assert!(matches!(err, StatsError::Conflict { .. }));

        let stats = service.get_career_stats(player).await.unwrap();
        assert_eq!(stats.total_runs, 12);
    }

    #[tokio::test]
    async fn invalid_request_stores_nothing() {
        let (repo, service) = service();
        let mut request = record_request(Uuid::new_v4(), Uuid::new_v4());
        request.wickets_taken = -2;

        assert!(matches!(
            service.record_performance(request).await,
            Err(StatsError::Validation(_))
        ));
        let (_, total) = repo
            .list_performances(&PerformanceFilters::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn updating_runs_keeps_original_balls() {
        let (_repo, service) = service();
        let player = Uuid::new_v4();
        let mut request = record_request(player, Uuid::new_v4());
        request.runs_scored = 30;
        request.balls_faced = 24;
        let fact = service.record_performance(request).await.unwrap();

        let updated = service
            .update_performance(
                fact.id,
                PerformanceChangeSet {
                    runs_scored: Some(36),
                    ..PerformanceChangeSet::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.balls_faced, 24);
        assert_eq!(updated.strike_rate, 150.0);
        let stats = service.get_career_stats(player).await.unwrap();
        assert_eq!(stats.total_runs, 36);
    }

    #[tokio::test]
    async fn empty_update_returns_stored_fact() {
        let (_repo, service) = service();
        let fact = service
            .record_performance(record_request(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();

        let same = service
            .update_performance(fact.id, PerformanceChangeSet::default())
            .await
            .unwrap();
        assert_eq!(same, fact);
    }

    #[tokio::test]
    async fn missing_performance_is_not_found() {
        let (_repo, service) = service();
        let id = Uuid::new_v4();
        assert!(matches!(
            service.get_performance(id).await,
            Err(StatsError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_performance(id).await,
            Err(StatsError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update_performance(
                    id,
                    PerformanceChangeSet {
                        catches: Some(1),
                        ..PerformanceChangeSet::default()
                    }
                )
                .await,
            Err(StatsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_before_refresh() {
        let (repo, service) = service();
        let err = service
            .get_leaderboard("most_catches", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::Validation(msg) if msg.contains("most_catches")));
        assert!(repo
            .get_leaderboard(LeaderboardCategory::MostRuns, None, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn career_stats_for_unknown_player_is_zero() {
        let (_repo, service) = service();
        let player = Uuid::new_v4();
        let stats = service.get_career_stats(player).await.unwrap();
        assert_eq!(stats, CareerAggregate::zero(player));
    }
}
