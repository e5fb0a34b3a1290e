use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    repository::StatsRepository, validation::PerformancePatch, CareerAggregate, DismissalKind,
    LeaderboardCategory, LeaderboardEntry, PerformanceFact, PerformanceFilters, StatsError,
    ALL_TIME_SEASON,
};

const PERFORMANCE_COLUMNS: &str = "id, player_id, match_id, team_id, played, captain, \
     vice_captain, wicket_keeper, batting_position, runs_scored, balls_faced, fours, sixes, \
     strike_rate, dismissal_type, dismissed_by_player_id, overs_bowled, runs_conceded, \
     wickets_taken, maidens, economy_rate, bowling_strike_rate, catches, run_outs, stumpings, \
     player_of_match, created_at, updated_at";

const CAREER_COLUMNS: &str = "player_id, total_matches, total_innings, total_runs, \
     total_balls_faced, total_fours, total_sixes, highest_score, fifties, hundreds, ducks, \
     not_outs, batting_average, batting_strike_rate, total_overs_bowled, total_runs_conceded, \
     total_wickets, total_maidens, best_bowling_figures, bowling_average, bowling_economy, \
     bowling_strike_rate, five_wicket_hauls, total_catches, total_run_outs, total_stumpings, \
     player_of_match_awards";

/// Postgres caps a statement at 65 535 bind parameters; each entry binds 5.
const LEADERBOARD_BINDS_PER_ROW: usize = 5;
const LEADERBOARD_INSERT_BATCH: usize = 1_000;
const _: () = assert!(LEADERBOARD_INSERT_BATCH * LEADERBOARD_BINDS_PER_ROW <= u16::MAX as usize);

/// PostgreSQL implementation of the statistics repository
pub struct PostgresStatsRepository {
    pool: PgPool,
}

impl PostgresStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StatsError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StatsError::Repository(e.to_string()))
    }
}

fn performance_from_row(row: &PgRow) -> Result<PerformanceFact, StatsError> {
    let dismissal_type = row
        .try_get::<Option<String>, _>("dismissal_type")?
        .map(|raw| {
            DismissalKind::from_str(&raw).map_err(|_| {
                StatsError::Repository(format!("stored dismissal type is invalid: {raw}"))
            })
        })
        .transpose()?;

    Ok(PerformanceFact {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        match_id: row.try_get("match_id")?,
        team_id: row.try_get("team_id")?,
        played: row.try_get("played")?,
        captain: row.try_get("captain")?,
        vice_captain: row.try_get("vice_captain")?,
        wicket_keeper: row.try_get("wicket_keeper")?,
        batting_position: row.try_get("batting_position")?,
        runs_scored: row.try_get("runs_scored")?,
        balls_faced: row.try_get("balls_faced")?,
        fours: row.try_get("fours")?,
        sixes: row.try_get("sixes")?,
        strike_rate: row.try_get("strike_rate")?,
        dismissal_type,
        dismissed_by_player_id: row.try_get("dismissed_by_player_id")?,
        overs_bowled: row.try_get("overs_bowled")?,
        runs_conceded: row.try_get("runs_conceded")?,
        wickets_taken: row.try_get("wickets_taken")?,
        maidens: row.try_get("maidens")?,
        economy_rate: row.try_get("economy_rate")?,
        bowling_strike_rate: row.try_get("bowling_strike_rate")?,
        catches: row.try_get("catches")?,
        run_outs: row.try_get("run_outs")?,
        stumpings: row.try_get("stumpings")?,
        player_of_match: row.try_get("player_of_match")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn career_from_row(row: &PgRow) -> Result<CareerAggregate, StatsError> {
    Ok(CareerAggregate {
        player_id: row.try_get("player_id")?,
        total_matches: row.try_get("total_matches")?,
        total_innings: row.try_get("total_innings")?,
        total_runs: row.try_get("total_runs")?,
        total_balls_faced: row.try_get("total_balls_faced")?,
        total_fours: row.try_get("total_fours")?,
        total_sixes: row.try_get("total_sixes")?,
        highest_score: row.try_get("highest_score")?,
        fifties: row.try_get("fifties")?,
        hundreds: row.try_get("hundreds")?,
        ducks: row.try_get("ducks")?,
        not_outs: row.try_get("not_outs")?,
        batting_average: row.try_get("batting_average")?,
        batting_strike_rate: row.try_get("batting_strike_rate")?,
        total_overs_bowled: row.try_get("total_overs_bowled")?,
        total_runs_conceded: row.try_get("total_runs_conceded")?,
        total_wickets: row.try_get("total_wickets")?,
        total_maidens: row.try_get("total_maidens")?,
        best_bowling_figures: row.try_get("best_bowling_figures")?,
        bowling_average: row.try_get("bowling_average")?,
        bowling_economy: row.try_get("bowling_economy")?,
        bowling_strike_rate: row.try_get("bowling_strike_rate")?,
        five_wicket_hauls: row.try_get("five_wicket_hauls")?,
        total_catches: row.try_get("total_catches")?,
        total_run_outs: row.try_get("total_run_outs")?,
        total_stumpings: row.try_get("total_stumpings")?,
        player_of_match_awards: row.try_get("player_of_match_awards")?,
    })
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &PerformanceFilters) {
    builder.push(" WHERE TRUE");
    if let Some(player_id) = filters.player_id {
        builder.push(" AND player_id = ").push_bind(player_id);
    }
    if let Some(match_id) = filters.match_id {
        builder.push(" AND match_id = ").push_bind(match_id);
    }
    if let Some(team_id) = filters.team_id {
        builder.push(" AND team_id = ").push_bind(team_id);
    }
    if let Some(min_runs) = filters.min_runs {
        builder.push(" AND runs_scored >= ").push_bind(min_runs);
    }
    if let Some(min_wickets) = filters.min_wickets {
        builder.push(" AND wickets_taken >= ").push_bind(min_wickets);
    }
}

fn season_key(season: Option<&str>) -> &str {
    season.unwrap_or(ALL_TIME_SEASON)
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    #[instrument(skip(self, fact), fields(player_id = %fact.player_id, match_id = %fact.match_id))]
    async fn insert_performance(
        &self,
        fact: PerformanceFact,
    ) -> Result<PerformanceFact, StatsError> {
        debug!(performance_id = %fact.id, "Inserting performance into database");

        let result = sqlx::query(&format!(
            "INSERT INTO player_match_performances ({PERFORMANCE_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
             $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)"
        ))
        .bind(fact.id)
        .bind(fact.player_id)
        .bind(fact.match_id)
        .bind(fact.team_id)
        .bind(fact.played)
        .bind(fact.captain)
        .bind(fact.vice_captain)
        .bind(fact.wicket_keeper)
        .bind(fact.batting_position)
        .bind(fact.runs_scored)
        .bind(fact.balls_faced)
        .bind(fact.fours)
        .bind(fact.sixes)
        .bind(fact.strike_rate)
        .bind(fact.dismissal_type.map(|d| d.to_string()))
        .bind(fact.dismissed_by_player_id)
        .bind(fact.overs_bowled)
        .bind(fact.runs_conceded)
        .bind(fact.wickets_taken)
        .bind(fact.maidens)
        .bind(fact.economy_rate)
        .bind(fact.bowling_strike_rate)
        .bind(fact.catches)
        .bind(fact.run_outs)
        .bind(fact.stumpings)
        .bind(fact.player_of_match)
        .bind(fact.created_at)
        .bind(fact.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(fact),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!("Performance already exists in database");
                Err(StatsError::Conflict {
                    player_id: fact.player_id,
                    match_id: fact.match_id,
                })
            }
            Err(e) => {
                warn!(error = %e, "Failed to insert performance");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_performance(&self, id: Uuid) -> Result<Option<PerformanceFact>, StatsError> {
        let row = sqlx::query(&format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM player_match_performances WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(performance_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn get_performance_by_player_match(
        &self,
        player_id: Uuid,
        match_id: Uuid,
    ) -> Result<Option<PerformanceFact>, StatsError> {
        let row = sqlx::query(&format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM player_match_performances \
             WHERE player_id = $1 AND match_id = $2"
        ))
        .bind(player_id)
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(performance_from_row).transpose()
    }

    #[instrument(skip(self, patch))]
    async fn update_performance(
        &self,
        id: Uuid,
        patch: &PerformancePatch,
    ) -> Result<PerformanceFact, StatsError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM player_match_performances WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut fact = match row {
            Some(row) => performance_from_row(&row)?,
            None => {
                warn!(performance_id = %id, "Performance not found for update");
                return Err(StatsError::performance_not_found(id));
            }
        };
        patch.apply(&mut fact);

        sqlx::query(
            "UPDATE player_match_performances SET played = $2, captain = $3, vice_captain = $4, \
             wicket_keeper = $5, batting_position = $6, runs_scored = $7, balls_faced = $8, \
             fours = $9, sixes = $10, strike_rate = $11, dismissal_type = $12, \
             dismissed_by_player_id = $13, overs_bowled = $14, runs_conceded = $15, \
             wickets_taken = $16, maidens = $17, economy_rate = $18, bowling_strike_rate = $19, \
             catches = $20, run_outs = $21, stumpings = $22, player_of_match = $23, \
             updated_at = $24 WHERE id = $1",
        )
        .bind(fact.id)
        .bind(fact.played)
        .bind(fact.captain)
        .bind(fact.vice_captain)
        .bind(fact.wicket_keeper)
        .bind(fact.batting_position)
        .bind(fact.runs_scored)
        .bind(fact.balls_faced)
        .bind(fact.fours)
        .bind(fact.sixes)
        .bind(fact.strike_rate)
        .bind(fact.dismissal_type.map(|d| d.to_string()))
        .bind(fact.dismissed_by_player_id)
        .bind(fact.overs_bowled)
        .bind(fact.runs_conceded)
        .bind(fact.wickets_taken)
        .bind(fact.maidens)
        .bind(fact.economy_rate)
        .bind(fact.bowling_strike_rate)
        .bind(fact.catches)
        .bind(fact.run_outs)
        .bind(fact.stumpings)
        .bind(fact.player_of_match)
        .bind(fact.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(performance_id = %id, "Performance updated in database");
        Ok(fact)
    }

    #[instrument(skip(self))]
    async fn delete_performance(&self, id: Uuid) -> Result<PerformanceFact, StatsError> {
        let row = sqlx::query(&format!(
            "DELETE FROM player_match_performances WHERE id = $1 RETURNING {PERFORMANCE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                debug!(performance_id = %id, "Performance deleted from database");
                performance_from_row(&row)
            }
            None => {
                warn!(performance_id = %id, "Performance not found for deletion");
                Err(StatsError::performance_not_found(id))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_performances(
        &self,
        filters: &PerformanceFilters,
    ) -> Result<(Vec<PerformanceFact>, u64), StatsError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM player_match_performances");
        push_filters(&mut count_query, filters);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let (_, limit) = filters.pagination();
        let mut list_query = QueryBuilder::new(format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM player_match_performances"
        ));
        push_filters(&mut list_query, filters);
        list_query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(filters.offset() as i64);

        let rows = list_query.build().fetch_all(&self.pool).await?;
        let facts = rows
            .iter()
            .map(performance_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((facts, total.max(0) as u64))
    }

    #[instrument(skip(self))]
    async fn list_player_performances(
        &self,
        player_id: Uuid,
    ) -> Result<Vec<PerformanceFact>, StatsError> {
        let rows = sqlx::query(&format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM player_match_performances \
             WHERE player_id = $1 AND played = TRUE"
        ))
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(performance_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn get_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<Option<CareerAggregate>, StatsError> {
        let row = sqlx::query(&format!(
            "SELECT {CAREER_COLUMNS} FROM player_career_stats WHERE player_id = $1"
        ))
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(career_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn get_or_init_career_aggregate(
        &self,
        player_id: Uuid,
    ) -> Result<CareerAggregate, StatsError> {
        sqlx::query(
            "INSERT INTO player_career_stats (player_id) VALUES ($1) \
             ON CONFLICT (player_id) DO NOTHING",
        )
        .bind(player_id)
        .execute(&self.pool)
        .await?;

        self.get_career_aggregate(player_id)
            .await?
            .ok_or_else(|| {
                StatsError::Repository(format!("career stats for {player_id} vanished"))
            })
    }

    #[instrument(skip(self, aggregate), fields(player_id = %aggregate.player_id))]
    async fn replace_career_aggregate(
        &self,
        aggregate: CareerAggregate,
    ) -> Result<(), StatsError> {
        sqlx::query(&format!(
            "INSERT INTO player_career_stats ({CAREER_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
             $19, $20, $21, $22, $23, $24, $25, $26, $27) \
             ON CONFLICT (player_id) DO UPDATE SET \
             total_matches = EXCLUDED.total_matches, total_innings = EXCLUDED.total_innings, \
             total_runs = EXCLUDED.total_runs, total_balls_faced = EXCLUDED.total_balls_faced, \
             total_fours = EXCLUDED.total_fours, total_sixes = EXCLUDED.total_sixes, \
             highest_score = EXCLUDED.highest_score, fifties = EXCLUDED.fifties, \
             hundreds = EXCLUDED.hundreds, ducks = EXCLUDED.ducks, not_outs = EXCLUDED.not_outs, \
             batting_average = EXCLUDED.batting_average, \
             batting_strike_rate = EXCLUDED.batting_strike_rate, \
             total_overs_bowled = EXCLUDED.total_overs_bowled, \
             total_runs_conceded = EXCLUDED.total_runs_conceded, \
             total_wickets = EXCLUDED.total_wickets, total_maidens = EXCLUDED.total_maidens, \
             best_bowling_figures = EXCLUDED.best_bowling_figures, \
             bowling_average = EXCLUDED.bowling_average, \
             bowling_economy = EXCLUDED.bowling_economy, \
             bowling_strike_rate = EXCLUDED.bowling_strike_rate, \
             five_wicket_hauls = EXCLUDED.five_wicket_hauls, \
             total_catches = EXCLUDED.total_catches, total_run_outs = EXCLUDED.total_run_outs, \
             total_stumpings = EXCLUDED.total_stumpings, \
             player_of_match_awards = EXCLUDED.player_of_match_awards, \
             updated_at = NOW()"
        ))
        .bind(aggregate.player_id)
        .bind(aggregate.total_matches)
        .bind(aggregate.total_innings)
        .bind(aggregate.total_runs)
        .bind(aggregate.total_balls_faced)
        .bind(aggregate.total_fours)
        .bind(aggregate.total_sixes)
        .bind(aggregate.highest_score)
        .bind(aggregate.fifties)
        .bind(aggregate.hundreds)
        .bind(aggregate.ducks)
        .bind(aggregate.not_outs)
        .bind(aggregate.batting_average)
        .bind(aggregate.batting_strike_rate)
        .bind(aggregate.total_overs_bowled)
        .bind(aggregate.total_runs_conceded)
        .bind(aggregate.total_wickets)
        .bind(aggregate.total_maidens)
        .bind(aggregate.best_bowling_figures.as_deref())
        .bind(aggregate.bowling_average)
        .bind(aggregate.bowling_economy)
        .bind(aggregate.bowling_strike_rate)
        .bind(aggregate.five_wicket_hauls)
        .bind(aggregate.total_catches)
        .bind(aggregate.total_run_outs)
        .bind(aggregate.total_stumpings)
        .bind(aggregate.player_of_match_awards)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to upsert career stats");
            StatsError::from(e)
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_career_aggregates(&self) -> Result<Vec<CareerAggregate>, StatsError> {
        let rows = sqlx::query(&format!("SELECT {CAREER_COLUMNS} FROM player_career_stats"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(career_from_row).collect()
    }

    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    async fn replace_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        entries: Vec<LeaderboardEntry>,
    ) -> Result<(), StatsError> {
        let season = season_key(season);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM leaderboard_entries WHERE category = $1 AND season = $2")
            .bind(category.as_ref())
            .bind(season)
            .execute(&mut *tx)
            .await?;

        for batch in entries.chunks(LEADERBOARD_INSERT_BATCH) {
            let mut insert = QueryBuilder::<Postgres>::new(
                "INSERT INTO leaderboard_entries (category, season, player_id, value, rank) ",
            );
            insert.push_values(batch, |mut row, entry| {
                row.push_bind(category.to_string())
                    .push_bind(season)
                    .push_bind(entry.player_id)
                    .push_bind(entry.value)
                    .push_bind(entry.rank);
            });
            insert.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(%category, season, "Leaderboard partition replaced in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        season: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let rows = sqlx::query(
            "SELECT player_id, value, rank FROM leaderboard_entries \
             WHERE category = $1 AND season = $2 ORDER BY rank LIMIT $3",
        )
        .bind(category.as_ref())
        .bind(season_key(season))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<LeaderboardEntry, StatsError> {
                Ok(LeaderboardEntry {
                    player_id: row.try_get("player_id")?,
                    category,
                    value: row.try_get("value")?,
                    rank: row.try_get("rank")?,
                    season: season.map(str::to_string),
                })
            })
            .collect()
    }
}
