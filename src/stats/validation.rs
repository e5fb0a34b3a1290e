use std::str::FromStr;

use chrono::Utc;
use uuid::Uuid;

use super::{
    metrics,
    types::{PerformanceChangeSet, RecordPerformanceRequest},
    DismissalKind, PerformanceFact, StatsError,
};

/// A change set that passed validation, with the dismissal kind parsed.
#[derive(Debug, Clone, Default)]
pub struct PerformancePatch {
    pub played: Option<bool>,
    pub captain: Option<bool>,
    pub vice_captain: Option<bool>,
    pub wicket_keeper: Option<bool>,
    pub batting_position: Option<i32>,
    pub runs_scored: Option<i32>,
    pub balls_faced: Option<i32>,
    pub fours: Option<i32>,
    pub sixes: Option<i32>,
    pub dismissal_type: Option<DismissalKind>,
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

impl PerformancePatch {
    /// Applies every present field, then rederives the rates from the
    /// resulting counters.
    pub fn apply(&self, fact: &mut PerformanceFact) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut fact.played, self.played);
        set(&mut fact.captain, self.captain);
        set(&mut fact.vice_captain, self.vice_captain);
        set(&mut fact.wicket_keeper, self.wicket_keeper);
        if self.batting_position.is_some() {
            fact.batting_position = self.batting_position;
        }
        set(&mut fact.runs_scored, self.runs_scored);
        set(&mut fact.balls_faced, self.balls_faced);
        set(&mut fact.fours, self.fours);
        set(&mut fact.sixes, self.sixes);
        if self.dismissal_type.is_some() {
            fact.dismissal_type = self.dismissal_type;
        }
        if self.dismissed_by_player_id.is_some() {
            fact.dismissed_by_player_id = self.dismissed_by_player_id;
        }
        set(&mut fact.overs_bowled, self.overs_bowled);
        set(&mut fact.runs_conceded, self.runs_conceded);
        set(&mut fact.wickets_taken, self.wickets_taken);
        set(&mut fact.maidens, self.maidens);
        set(&mut fact.catches, self.catches);
        set(&mut fact.run_outs, self.run_outs);
        set(&mut fact.stumpings, self.stumpings);
        set(&mut fact.player_of_match, self.player_of_match);

        metrics::apply(fact);
        fact.updated_at = Utc::now();
    }
}

/// Largest value any single-match counter may hold. Keeps career sums far
/// inside `i32`.
pub const MAX_MATCH_COUNTER: i32 = 10_000;
pub const MAX_MATCH_OVERS: f64 = 1_000.0;

fn bounded_counter(field: &str, value: i32) -> Result<i32, StatsError> {
    if !(0..=MAX_MATCH_COUNTER).contains(&value) {
        return Err(StatsError::Validation(format!(
            "{field} must be between 0 and {MAX_MATCH_COUNTER}"
        )));
    }
    Ok(value)
}

fn bounded_overs(value: f64) -> Result<f64, StatsError> {
    if !value.is_finite() || !(0.0..=MAX_MATCH_OVERS).contains(&value) {
        return Err(StatsError::Validation(format!(
            "overs_bowled must be between 0 and {MAX_MATCH_OVERS}"
        )));
    }
    Ok(value)
}

fn batting_position(value: i32) -> Result<i32, StatsError> {
    if value <= 0 {
        return Err(StatsError::Validation(
            "batting_position must be positive".to_string(),
        ));
    }
    Ok(value)
}

fn parse_dismissal(value: &str) -> Result<DismissalKind, StatsError> {
    DismissalKind::from_str(value)
        .map_err(|_| StatsError::Validation(format!("invalid dismissal type: {value}")))
}

/// Builds a new fact from a record request, rejecting out-of-range counters and
/// unknown dismissal kinds.
pub fn validate_record(request: RecordPerformanceRequest) -> Result<PerformanceFact, StatsError> {
    let dismissal_type = request
        .dismissal_type
        .as_deref()
        .map(parse_dismissal)
        .transpose()?;

    let now = Utc::now();
    let mut fact = PerformanceFact {
        id: Uuid::new_v4(),
        player_id: request.player_id,
        match_id: request.match_id,
        team_id: request.team_id,
        played: request.played,
        captain: request.captain,
        vice_captain: request.vice_captain,
        wicket_keeper: request.wicket_keeper,
        batting_position: request.batting_position.map(batting_position).transpose()?,
        runs_scored: bounded_counter("runs_scored", request.runs_scored)?,
        balls_faced: bounded_counter("balls_faced", request.balls_faced)?,
        fours: bounded_counter("fours", request.fours)?,
        sixes: bounded_counter("sixes", request.sixes)?,
        strike_rate: 0.0,
        dismissal_type,
        dismissed_by_player_id: request.dismissed_by_player_id,
        overs_bowled: bounded_overs(request.overs_bowled)?,
        runs_conceded: bounded_counter("runs_conceded", request.runs_conceded)?,
        wickets_taken: bounded_counter("wickets_taken", request.wickets_taken)?,
        maidens: bounded_counter("maidens", request.maidens)?,
        economy_rate: 0.0,
        bowling_strike_rate: 0.0,
        catches: bounded_counter("catches", request.catches)?,
        run_outs: bounded_counter("run_outs", request.run_outs)?,
        stumpings: bounded_counter("stumpings", request.stumpings)?,
        player_of_match: request.player_of_match,
        created_at: now,
        updated_at: now,
    };
    metrics::apply(&mut fact);
    Ok(fact)
}

pub fn validate_changes(changes: &PerformanceChangeSet) -> Result<PerformancePatch, StatsError> {
    let counter = |field: &str, value: Option<i32>| value.map(|v| bounded_counter(field, v)).transpose();

    Ok(PerformancePatch {
        played: changes.played,
        captain: changes.captain,
        vice_captain: changes.vice_captain,
        wicket_keeper: changes.wicket_keeper,
        batting_position: changes.batting_position.map(batting_position).transpose()?,
        runs_scored: counter("runs_scored", changes.runs_scored)?,
        balls_faced: counter("balls_faced", changes.balls_faced)?,
        fours: counter("fours", changes.fours)?,
        sixes: counter("sixes", changes.sixes)?,
        dismissal_type: changes
            .dismissal_type
            .as_deref()
            .map(parse_dismissal)
            .transpose()?,
        dismissed_by_player_id: changes.dismissed_by_player_id,
        overs_bowled: changes.overs_bowled.map(bounded_overs).transpose()?,
        runs_conceded: counter("runs_conceded", changes.runs_conceded)?,
        wickets_taken: counter("wickets_taken", changes.wickets_taken)?,
        maidens: counter("maidens", changes.maidens)?,
        catches: counter("catches", changes.catches)?,
        run_outs: counter("run_outs", changes.run_outs)?,
        stumpings: counter("stumpings", changes.stumpings)?,
        player_of_match: changes.player_of_match,
    })
}
