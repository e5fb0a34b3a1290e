use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Performance already recorded for player {player_id} in match {match_id}")]
    Conflict { player_id: Uuid, match_id: Uuid },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The triggering write committed but the derived aggregate could not be rebuilt.
    #[error("Career stats for player {player_id} are stale: {reason}")]
    Consistency { player_id: Uuid, reason: String },

    #[error("Repository error: {0}")]
    Repository(String),
}

impl StatsError {
    pub fn performance_not_found(performance_id: Uuid) -> Self {
        StatsError::NotFound(format!("performance {performance_id} not found"))
    }
}

impl From<sqlx::Error> for StatsError {
    fn from(err: sqlx::Error) -> Self {
        StatsError::Repository(err.to_string())
    }
}
