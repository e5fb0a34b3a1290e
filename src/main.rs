use std::sync::Arc;

use cricket_stats::{
    app, AppConfig, AppState, InMemoryStatsRepository, PostgresStatsRepository, StatsRepository,
    StatsService,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cricket_stats=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run(AppConfig::from_env()).await {
        error!(error = %err, "Server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting cricket statistics server");

    let repository: Arc<dyn StatsRepository> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;
            let repository = PostgresStatsRepository::new(pool);
            repository.migrate().await?;
            info!("Using PostgreSQL statistics store");
            Arc::new(repository)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory statistics store");
            Arc::new(InMemoryStatsRepository::new())
        }
    };

    let service = StatsService::builder(repository)
        .with_recompute_policy(config.recompute_policy())
        .build();
    let app = app(AppState::new(Arc::new(service)));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server running on http://localhost:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
