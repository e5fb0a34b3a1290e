use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// Season label stored for leaderboards that cover every season.
pub const ALL_TIME_SEASON: &str = "all_time";

/// Canonical partition label: `None` stands for all-time, whether the caller
/// omitted the season, left it blank, or spelled out `all_time`.
pub fn season_partition(season: Option<&str>) -> Option<&str> {
    season
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ALL_TIME_SEASON)
}

/// One player's record in one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceFact {
    pub id: Uuid,
    pub player_id: Uuid,
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub played: bool,
    pub captain: bool,
    pub vice_captain: bool,
    pub wicket_keeper: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batting_position: Option<i32>,
    pub runs_scored: i32,
    pub balls_faced: i32,
    pub fours: i32,
    pub sixes: i32,
    pub strike_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal_type: Option<DismissalKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_by_player_id: Option<Uuid>,
    pub overs_bowled: f64,
    pub runs_conceded: i32,
    pub wickets_taken: i32,
    pub maidens: i32,
    pub economy_rate: f64,
    pub bowling_strike_rate: f64,
    pub catches: i32,
    pub run_outs: i32,
    pub stumpings: i32,
    pub player_of_match: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PerformanceFact {
    /// True when the batting appearance ended without a dismissal.
    pub fn is_not_out(&self) -> bool {
        matches!(self.dismissal_type, None | Some(DismissalKind::NotOut))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DismissalKind {
    Bowled,
    Caught,
    Lbw,
    RunOut,
    Stumped,
    HitWicket,
    RetiredHurt,
    NotOut,
    TimedOut,
    Obstructing,
    HitTwice,
}

/// Career summary for one player, derived in full from their played facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerAggregate {
    pub player_id: Uuid,
    pub total_matches: i32,
    pub total_innings: i32,
    pub total_runs: i32,
    pub total_balls_faced: i32,
    pub total_fours: i32,
    pub total_sixes: i32,
    pub highest_score: i32,
    pub fifties: i32,
    pub hundreds: i32,
    pub ducks: i32,
    pub not_outs: i32,
    pub batting_average: f64,
    pub batting_strike_rate: f64,
    pub total_overs_bowled: f64,
    pub total_runs_conceded: i32,
    pub total_wickets: i32,
    pub total_maidens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_bowling_figures: Option<String>,
    pub bowling_average: f64,
    pub bowling_economy: f64,
    pub bowling_strike_rate: f64,
    pub five_wicket_hauls: i32,
    pub total_catches: i32,
    pub total_run_outs: i32,
    pub total_stumpings: i32,
    pub player_of_match_awards: i32,
}

impl CareerAggregate {
    pub fn zero(player_id: Uuid) -> Self {
        Self {
            player_id,
            ..Self::default()
        }
    }
}

/// Ranking criterion with its own sort direction and qualification floor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardCategory {
    #[strum(to_string = "most_runs", serialize = "most-runs")]
    MostRuns,
    #[strum(to_string = "most_wickets", serialize = "most-wickets")]
    MostWickets,
    #[strum(to_string = "best_batting_average", serialize = "batting")]
    BestBattingAverage,
    #[strum(to_string = "best_bowling_average", serialize = "bowling")]
    BestBowlingAverage,
    #[strum(to_string = "best_strike_rate", serialize = "strike-rate")]
    BestStrikeRate,
    #[strum(to_string = "best_economy", serialize = "economy")]
    BestEconomy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One player's rank within a (category, season) partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: Uuid,
    pub category: LeaderboardCategory,
    pub value: f64,
    pub rank: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

/// Filters for listing performances. Page and limit are normalized by
/// [`PerformanceFilters::pagination`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceFilters {
    pub player_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub min_runs: Option<i32>,
    pub min_wickets: Option<i32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

impl PerformanceFilters {
    pub fn for_player(player_id: Uuid) -> Self {
        Self {
            player_id: Some(player_id),
            ..Self::default()
        }
    }

    /// Returns `(page, limit)` with page >= 1 and limit in 1..=100.
    pub fn pagination(&self) -> (u32, u32) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT);
        (page, limit)
    }

    pub fn offset(&self) -> u64 {
        let (page, limit) = self.pagination();
        u64::from(page - 1) * u64::from(limit)
    }

    pub fn matches(&self, fact: &PerformanceFact) -> bool {
        self.player_id.map_or(true, |id| fact.player_id == id)
            && self.match_id.map_or(true, |id| fact.match_id == id)
            && self.team_id.map_or(true, |id| fact.team_id == id)
            && self.min_runs.map_or(true, |min| fact.runs_scored >= min)
            && self.min_wickets.map_or(true, |min| fact.wickets_taken >= min)
    }
}
