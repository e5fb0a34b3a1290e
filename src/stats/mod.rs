pub mod aggregator;
pub mod handlers;
pub mod leaderboard;
pub mod metrics;
pub mod postgres_repository;
pub mod service;
pub mod trigger;
pub mod types;
pub mod validation;

mod errors;
pub mod models;
pub mod repository;

pub use errors::StatsError;
pub use models::*;
pub use postgres_repository::PostgresStatsRepository;
pub use repository::{InMemoryStatsRepository, StatsRepository};
pub use service::{StatsService, StatsServiceBuilder};
pub use trigger::RecomputePolicy;
