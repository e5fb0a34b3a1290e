use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use cricket_stats::{
    app, AppState, InMemoryStatsRepository, RecomputePolicy, StatsRepository, StatsService,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub service: Arc<StatsService>,
    pub repository: Arc<dyn StatsRepository>,
}

pub struct TestSetupBuilder {
    repository: Option<Arc<dyn StatsRepository>>,
    max_attempts: u32,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            repository: None,
            max_attempts: 3,
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn StatsRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn build(self) -> TestSetup {
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryStatsRepository::new()));
        let policy = RecomputePolicy {
            max_attempts: self.max_attempts,
            base_backoff: Duration::from_millis(1),
        };
        let service = Arc::new(
            StatsService::builder(repository.clone())
                .with_recompute_policy(policy)
                .build(),
        );

        TestSetup {
            app: app(AppState::new(service.clone())),
            service,
            repository,
        }
    }
}

impl TestSetup {
    /// Sends one request through the router and decodes the JSON body, if any.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}
