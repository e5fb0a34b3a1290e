//! Per-fact rate derivation. Every division is guarded so that an empty
//! denominator yields zero instead of NaN or infinity.

use super::models::PerformanceFact;

/// Balls in one over. Overs are fractional (3.4 = three overs and four balls)
/// but `overs * BALLS_PER_OVER` is used as the balls-bowled proxy throughout.
pub const BALLS_PER_OVER: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedRates {
    pub strike_rate: f64,
    pub economy_rate: f64,
    pub bowling_strike_rate: f64,
}

/// Runs per 100 balls faced.
pub fn strike_rate(runs_scored: i32, balls_faced: i32) -> f64 {
    if balls_faced > 0 {
        (f64::from(runs_scored) / f64::from(balls_faced)) * 100.0
    } else {
        0.0
    }
}

/// Runs conceded per over.
pub fn economy_rate(runs_conceded: i32, overs_bowled: f64) -> f64 {
    if overs_bowled > 0.0 {
        f64::from(runs_conceded) / overs_bowled
    } else {
        0.0
    }
}

/// Balls bowled per wicket.
pub fn bowling_strike_rate(overs_bowled: f64, wickets_taken: i32) -> f64 {
    if wickets_taken > 0 {
        (overs_bowled * BALLS_PER_OVER) / f64::from(wickets_taken)
    } else {
        0.0
    }
}

pub fn derive(fact: &PerformanceFact) -> DerivedRates {
    DerivedRates {
        strike_rate: strike_rate(fact.runs_scored, fact.balls_faced),
        economy_rate: economy_rate(fact.runs_conceded, fact.overs_bowled),
        bowling_strike_rate: bowling_strike_rate(fact.overs_bowled, fact.wickets_taken),
    }
}

/// Overwrites the derived columns of `fact` from its raw counters.
pub fn apply(fact: &mut PerformanceFact) {
    let rates = derive(fact);
    fact.strike_rate = rates.strike_rate;
    fact.economy_rate = rates.economy_rate;
    fact.bowling_strike_rate = rates.bowling_strike_rate;
}
