use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{LeaderboardEntry, PerformanceFact, ALL_TIME_SEASON};

/// Request payload for recording a player's match performance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPerformanceRequest {
    pub player_id: Uuid,
    pub match_id: Uuid,
    pub team_id: Uuid,
    #[serde(default)]
    pub played: bool,
    #[serde(default)]
    pub captain: bool,
    #[serde(default)]
    pub vice_captain: bool,
    #[serde(default)]
    pub wicket_keeper: bool,
    pub batting_position: Option<i32>,
    #[serde(default)]
    pub runs_scored: i32,
    #[serde(default)]
    pub balls_faced: i32,
    #[serde(default)]
    pub fours: i32,
    #[serde(default)]
    pub sixes: i32,
    /// Parsed into a `DismissalKind`; anything unknown is rejected.
    pub dismissal_type: Option<String>,
    pub dismissed_by_player_id: Option<Uuid>,
    #[serde(default)]
    pub overs_bowled: f64,
    #[serde(default)]
    pub runs_conceded: i32,
    #[serde(default)]
    pub wickets_taken: i32,
    #[serde(default)]
    pub maidens: i32,
    #[serde(default)]
    pub catches: i32,
    #[serde(default)]
    pub run_outs: i32,
    #[serde(default)]
    pub stumpings: i32,
    #[serde(default)]
    pub player_of_match: bool,
}

/// Partial update of a performance. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceChangeSet {
    pub played: Option<bool>,
    pub captain: Option<bool>,
    pub vice_captain: Option<bool>,
    pub wicket_keeper: Option<bool>,
    pub batting_position: Option<i32>,
    pub runs_scored: Option<i32>,
    pub balls_faced: Option<i32>,
    pub fours: Option<i32>,
    pub sixes: Option<i32>,
    pub dismissal_type: Option<String>,
    pub dismissed_by_player_id: Option<Uuid>,
    pub overs_bowled: Option<f64>,
    pub runs_conceded: Option<i32>,
    pub wickets_taken: Option<i32>,
    pub maidens: Option<i32>,
    pub catches: Option<i32>,
    pub run_outs: Option<i32>,
    pub stumpings: Option<i32>,
    pub player_of_match: Option<bool>,
}

impl PerformanceChangeSet {
    pub fn is_empty(&self) -> bool {
        self.played.is_none()
            && self.captain.is_none()
            && self.vice_captain.is_none()
            && self.wicket_keeper.is_none()
            && self.batting_position.is_none()
            && self.runs_scored.is_none()
            && self.balls_faced.is_none()
            && self.fours.is_none()
            && self.sixes.is_none()
            && self.dismissal_type.is_none()
            && self.dismissed_by_player_id.is_none()
            && self.overs_bowled.is_none()
            && self.runs_conceded.is_none()
            && self.wickets_taken.is_none()
            && self.maidens.is_none()
            && self.catches.is_none()
            && self.run_outs.is_none()
            && self.stumpings.is_none()
            && self.player_of_match.is_none()
    }
}

/// Response for listing performances
#[derive(Debug, Serialize, Deserialize)]
pub struct PerformanceListResponse {
    pub performances: Vec<PerformanceFact>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Response for leaderboard queries
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub category: String,
    pub season: String,
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardResponse {
    pub fn new(category: String, season: Option<&str>, entries: Vec<LeaderboardEntry>) -> Self {
        Self {
            category,
            season: season.unwrap_or(ALL_TIME_SEASON).to_string(),
            entries,
        }
    }
}

/// Response for refreshing one leaderboard partition
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardRefreshResponse {
    pub category: String,
    pub season: String,
    pub ranked: usize,
}

impl LeaderboardRefreshResponse {
    pub fn new(category: String, season: Option<&str>, ranked: usize) -> Self {
        Self {
            category,
            season: season.unwrap_or(ALL_TIME_SEASON).to_string(),
            ranked,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub season: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeasonQuery {
    pub season: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
