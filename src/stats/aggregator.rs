use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    metrics::BALLS_PER_OVER, repository::StatsRepository, CareerAggregate, PerformanceFact,
    StatsError,
};

const FIFTY: i32 = 50;
const HUNDRED: i32 = 100;
const FIVE_WICKET_HAUL: i32 = 5;

/// Rebuilds a player's career summary from every fact they played in.
///
/// Recomputes for the same player are serialized on a per-player lock so a
/// slow run holding an older fact set can never overwrite a newer result.
pub struct CareerAggregator {
    repository: Arc<dyn StatsRepository>,
    player_mutexes: Arc<RwLock<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl CareerAggregator {
    pub fn new(repository: Arc<dyn StatsRepository>) -> Self {
        Self {
            repository,
            player_mutexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[instrument(skip(self))]
    pub async fn recompute(&self, player_id: Uuid) -> Result<CareerAggregate, StatsError> {
        let player_lock = self.player_lock(player_id).await;
        let _guard = player_lock.lock().await;

        let facts = self.repository.list_player_performances(player_id).await?;
        let aggregate = compute(player_id, &facts)?;

        debug!(
            %player_id,
            facts = facts.len(),
            total_runs = aggregate.total_runs,
            total_wickets = aggregate.total_wickets,
            "Replacing career aggregate"
        );

        self.repository
            .replace_career_aggregate(aggregate.clone())
            .await?;

        Ok(aggregate)
    }

    async fn player_lock(&self, player_id: Uuid) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.player_mutexes.read().await;
            if let Some(lock) = guard.get(&player_id) {
                return lock.clone();
            }
        }

        let mut guard = self.player_mutexes.write().await;
        guard
            .entry(player_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Derives the full aggregate for `player_id` from `facts`.
///
/// Facts for other players and facts with `played = false` are ignored. The
/// input is summed in (match, id) order so repeated calls are bit-identical
/// regardless of the order the store returned them in. A total that no longer
/// fits an `i32` is reported as a `Validation` error.
pub fn compute(player_id: Uuid, facts: &[PerformanceFact]) -> Result<CareerAggregate, StatsError> {
    let mut played: Vec<&PerformanceFact> = facts
        .iter()
        .filter(|f| f.player_id == player_id && f.played)
        .collect();
    played.sort_by_key(|f| (f.match_id, f.id));

    let mut agg = CareerAggregate::zero(player_id);
    let mut matches = BTreeSet::new();

    for fact in &played {
        matches.insert(fact.match_id);

        if fact.balls_faced > 0 {
            agg.total_innings += 1;
            if fact.runs_scored == 0 {
                agg.ducks += 1;
            }
        }
        add(&mut agg.total_runs, fact.runs_scored, "total_runs", player_id)?;
        add(&mut agg.total_balls_faced, fact.balls_faced, "total_balls_faced", player_id)?;
        add(&mut agg.total_fours, fact.fours, "total_fours", player_id)?;
        add(&mut agg.total_sixes, fact.sixes, "total_sixes", player_id)?;
        agg.highest_score = agg.highest_score.max(fact.runs_scored);
        if fact.runs_scored >= HUNDRED {
            agg.hundreds += 1;
        } else if fact.runs_scored >= FIFTY {
            agg.fifties += 1;
        }
        if fact.is_not_out() {
            agg.not_outs += 1;
        }

        agg.total_overs_bowled += fact.overs_bowled;
        add(&mut agg.total_runs_conceded, fact.runs_conceded, "total_runs_conceded", player_id)?;
        add(&mut agg.total_wickets, fact.wickets_taken, "total_wickets", player_id)?;
        add(&mut agg.total_maidens, fact.maidens, "total_maidens", player_id)?;
        if fact.wickets_taken >= FIVE_WICKET_HAUL {
            agg.five_wicket_hauls += 1;
        }

        add(&mut agg.total_catches, fact.catches, "total_catches", player_id)?;
        add(&mut agg.total_run_outs, fact.run_outs, "total_run_outs", player_id)?;
        add(&mut agg.total_stumpings, fact.stumpings, "total_stumpings", player_id)?;
        if fact.player_of_match {
            agg.player_of_match_awards += 1;
        }
    }

    agg.total_matches = matches.len() as i32;

    let dismissed_innings = agg.total_innings - agg.not_outs;
    if dismissed_innings > 0 {
        agg.batting_average = f64::from(agg.total_runs) / f64::from(dismissed_innings);
    }
    if agg.total_balls_faced > 0 {
        agg.batting_strike_rate =
            (f64::from(agg.total_runs) / f64::from(agg.total_balls_faced)) * 100.0;
    }
    if agg.total_wickets > 0 {
        agg.bowling_average = f64::from(agg.total_runs_conceded) / f64::from(agg.total_wickets);
        agg.bowling_strike_rate =
            (agg.total_overs_bowled * BALLS_PER_OVER) / f64::from(agg.total_wickets);
    }
    if agg.total_overs_bowled > 0.0 {
        agg.bowling_economy = f64::from(agg.total_runs_conceded) / agg.total_overs_bowled;
    }

    agg.best_bowling_figures = best_bowling_figures(&played);
    Ok(agg)
}

fn add(total: &mut i32, value: i32, field: &str, player_id: Uuid) -> Result<(), StatsError> {
    *total = total.checked_add(value).ok_or_else(|| {
        StatsError::Validation(format!("{field} for player {player_id} exceeds the supported range"))
    })?;
    Ok(())
}

/// Most wickets in a single match, fewest runs conceded among equals, as `W/R`.
fn best_bowling_figures(facts: &[&PerformanceFact]) -> Option<String> {
    facts
        .iter()
        .filter(|f| f.overs_bowled > 0.0)
        .max_by(|a, b| {
            a.wickets_taken
                .cmp(&b.wickets_taken)
                .then(b.runs_conceded.cmp(&a.runs_conceded))
        })
        .map(|f| format!("{}/{}", f.wickets_taken, f.runs_conceded))
}
