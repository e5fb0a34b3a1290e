// Library crate for the cricket statistics service
// This file exposes the public API for integration tests

pub mod config;
pub mod shared;
pub mod stats;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use shared::{AppError, AppState};
pub use stats::{
    CareerAggregate, InMemoryStatsRepository, LeaderboardCategory, LeaderboardEntry,
    PerformanceFact, PostgresStatsRepository, RecomputePolicy, StatsError, StatsRepository,
    StatsService,
};

/// Builds the HTTP router over the given state.
pub fn app(state: AppState) -> Router {
    use stats::handlers;

    Router::new()
        .route("/", get(|| async { "cricket stats" }))
        .route(
            "/performances",
            post(handlers::record_performance).get(handlers::list_performances),
        )
        .route(
            "/performances/:id",
            get(handlers::get_performance)
                .put(handlers::update_performance)
                .delete(handlers::delete_performance),
        )
        .route("/players/:id/stats", get(handlers::get_career_stats))
        .route(
            "/players/:id/refresh-stats",
            post(handlers::refresh_career_stats),
        )
        .route(
            "/players/:player_id/matches/:match_id/performance",
            get(handlers::get_player_match_performance),
        )
        .route("/leaderboards/refresh", post(handlers::refresh_leaderboards))
        .route("/leaderboards/:category", get(handlers::get_leaderboard))
        .route(
            "/leaderboards/:category/refresh",
            post(handlers::refresh_leaderboard),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
