use cricket_stats::stats::types::RecordPerformanceRequest;
use serde_json::{json, Value};
use uuid::Uuid;

// ============================================================================
// Performance Builders
// ============================================================================

/// Fluent builder for record requests. Defaults to a played appearance in a
/// fresh match with every counter at zero.
#[derive(Clone)]
pub struct PerformanceBuilder {
    request: RecordPerformanceRequest,
}

impl PerformanceBuilder {
    pub fn new(player_id: Uuid) -> Self {
        Self {
            request: RecordPerformanceRequest {
                player_id,
                match_id: Uuid::new_v4(),
                team_id: Uuid::new_v4(),
                played: true,
                ..RecordPerformanceRequest::default()
            },
        }
    }

    pub fn in_match(mut self, match_id: Uuid) -> Self {
        self.request.match_id = match_id;
        self
    }

    /// Batting line ending in `bowled`.
    pub fn batting(mut self, runs: i32, balls: i32) -> Self {
        self.request.runs_scored = runs;
        self.request.balls_faced = balls;
        self.request.dismissal_type = Some("bowled".to_string());
        self
    }

    pub fn bowling(mut self, overs: f64, runs_conceded: i32, wickets: i32) -> Self {
        self.request.overs_bowled = overs;
        self.request.runs_conceded = runs_conceded;
        self.request.wickets_taken = wickets;
        self
    }

    pub fn did_not_play(mut self) -> Self {
        self.request.played = false;
        self
    }

    pub fn build(self) -> RecordPerformanceRequest {
        self.request
    }

    pub fn to_json(&self) -> Value {
        json!(self.request)
    }
}
