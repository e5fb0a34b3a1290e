use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    types::{
        LeaderboardQuery, LeaderboardRefreshResponse, LeaderboardResponse, MessageResponse,
        PerformanceChangeSet, PerformanceListResponse, RecordPerformanceRequest, SeasonQuery,
    },
    season_partition, CareerAggregate, PerformanceFact, PerformanceFilters,
};
use crate::shared::{AppError, AppState};

/// POST /performances
#[instrument(name = "record_performance", skip(state, request))]
pub async fn record_performance(
    State(state): State<AppState>,
    Json(request): Json<RecordPerformanceRequest>,
) -> Result<(StatusCode, Json<PerformanceFact>), AppError> {
    info!(player_id = %request.player_id, match_id = %request.match_id, "Recording performance");

    let fact = state.stats_service.record_performance(request).await?;
    Ok((StatusCode::CREATED, Json(fact)))
}

/// GET /performances
#[instrument(name = "list_performances", skip(state))]
pub async fn list_performances(
    State(state): State<AppState>,
    Query(filters): Query<PerformanceFilters>,
) -> Result<Json<PerformanceListResponse>, AppError> {
    let response = state.stats_service.list_performances(filters).await?;
    info!(
        returned = response.performances.len(),
        total = response.total,
        "Performances listed"
    );
    Ok(Json(response))
}

/// GET /performances/:id
#[instrument(name = "get_performance", skip(state))]
pub async fn get_performance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PerformanceFact>, AppError> {
    Ok(Json(state.stats_service.get_performance(id).await?))
}

/// PUT /performances/:id
///
/// Only the fields present in the body change.
#[instrument(name = "update_performance", skip(state, changes))]
pub async fn update_performance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<PerformanceChangeSet>,
) -> Result<Json<PerformanceFact>, AppError> {
    let fact = state.stats_service.update_performance(id, changes).await?;
    Ok(Json(fact))
}

/// DELETE /performances/:id
#[instrument(name = "delete_performance", skip(state))]
pub async fn delete_performance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.stats_service.delete_performance(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /players/:id/stats
#[instrument(name = "get_career_stats", skip(state))]
pub async fn get_career_stats(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<CareerAggregate>, AppError> {
    Ok(Json(state.stats_service.get_career_stats(player_id).await?))
}

/// POST /players/:id/refresh-stats
#[instrument(name = "refresh_career_stats", skip(state))]
pub async fn refresh_career_stats(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<CareerAggregate>, AppError> {
    let aggregate = state.stats_service.refresh_career_stats(player_id).await?;
    info!(%player_id, total_matches = aggregate.total_matches, "Career stats refreshed");
    Ok(Json(aggregate))
}

/// GET /players/:player_id/matches/:match_id/performance
#[instrument(name = "get_player_match_performance", skip(state))]
pub async fn get_player_match_performance(
    State(state): State<AppState>,
    Path((player_id, match_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PerformanceFact>, AppError> {
    let fact = state
        .stats_service
        .get_player_match_performance(player_id, match_id)
        .await?;
    Ok(Json(fact))
}

/// GET /leaderboards/:category
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let season = season_partition(query.season.as_deref());
    let (category, entries) = state
        .stats_service
        .get_leaderboard(&category, season, query.limit)
        .await?;

    info!(%category, entries = entries.len(), "Leaderboard served");
    Ok(Json(LeaderboardResponse::new(
        category.to_string(),
        season,
        entries,
    )))
}

/// POST /leaderboards/:category/refresh
#[instrument(name = "refresh_leaderboard", skip(state))]
pub async fn refresh_leaderboard(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<LeaderboardRefreshResponse>, AppError> {
    let season = season_partition(query.season.as_deref());
    let (category, ranked) = state
        .stats_service
        .refresh_leaderboard(&category, season)
        .await?;

    info!(%category, ranked, "Leaderboard refreshed");
    Ok(Json(LeaderboardRefreshResponse::new(
        category.to_string(),
        season,
        ranked,
    )))
}

/// POST /leaderboards/refresh
#[instrument(name = "refresh_leaderboards", skip(state))]
pub async fn refresh_leaderboards(
    State(state): State<AppState>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .stats_service
        .refresh_all_leaderboards(season_partition(query.season.as_deref()))
        .await?;

    Ok(Json(MessageResponse {
        message: "Leaderboards refreshed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::stats::LeaderboardCategory;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        Router::new()
            .route("/performances", post(record_performance).get(list_performances))
            .route(
                "/performances/:id",
                get(get_performance)
                    .put(update_performance)
                    .delete(delete_performance),
            )
            .route("/players/:id/stats", get(get_career_stats))
            .route("/leaderboards/:category", get(get_leaderboard))
            .route("/leaderboards/:category/refresh", post(refresh_leaderboard))
            .with_state(AppStateBuilder::new().build())
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_record_performance_handler() {
        let app = app();
        let player_id = Uuid::new_v4();
        let request = json_request(
            "POST",
            "/performances",
            json!({
                "player_id": player_id,
                "match_id": Uuid::new_v4(),
                "team_id": Uuid::new_v4(),
                "played": true,
                "runs_scored": 30,
                "balls_faced": 24,
                "dismissal_type": "caught"
            }),
        );

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let fact: PerformanceFact = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(fact.strike_rate, 125.0);

        let request = Request::builder()
            .uri(format!("/players/{player_id}/stats"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats: CareerAggregate = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(stats.total_runs, 30);
        assert_eq!(stats.batting_average, 30.0);
    }

    #[tokio::test]
    async fn test_record_performance_handler_rejects_negative_runs() {
        let request = json_request(
            "POST",
            "/performances",
            json!({
                "player_id": Uuid::new_v4(),
                "match_id": Uuid::new_v4(),
                "team_id": Uuid::new_v4(),
                "runs_scored": -4
            }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("runs_scored"));
    }

    #[tokio::test]
    async fn test_duplicate_performance_is_conflict() {
        let app = app();
        let payload = json!({
            "player_id": Uuid::new_v4(),
            "match_id": Uuid::new_v4(),
            "team_id": Uuid::new_v4(),
            "played": true
        });

        let first = app
            .clone()
            .oneshot(json_request("POST", "/performances", payload.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(json_request("POST", "/performances", payload))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_and_delete_performance() {
        let app = app();
        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/performances",
                json!({
                    "player_id": Uuid::new_v4(),
                    "match_id": Uuid::new_v4(),
                    "team_id": Uuid::new_v4(),
                    "played": true,
                    "runs_scored": 30,
                    "balls_faced": 24
                }),
            ))
            .await
            .unwrap();
        let fact: PerformanceFact = serde_json::from_value(body_json(created).await).unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/performances/{}", fact.id),
                json!({ "runs_scored": 36 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated: PerformanceFact = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(updated.strike_rate, 150.0);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/performances/{}", fact.id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let get = Request::builder()
            .uri(format!("/performances/{}", fact.id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(get).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_leaderboard_alias_and_unknown_category() {
        let app = app();
        let request = Request::builder()
            .uri("/leaderboards/most-runs?limit=5")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: LeaderboardResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body.category, LeaderboardCategory::MostRuns.to_string());
        assert_eq!(body.season, "all_time");
        assert!(body.entries.is_empty());

        let request = Request::builder()
            .uri("/leaderboards/most_catches")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_single_leaderboard() {
        let app = app();
        let player_id = Uuid::new_v4();
        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/performances",
                json!({
                    "player_id": player_id,
                    "match_id": Uuid::new_v4(),
                    "team_id": Uuid::new_v4(),
                    "played": true,
                    "overs_bowled": 4.0,
                    "runs_conceded": 22,
                    "wickets_taken": 3
                }),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let request = Request::builder()
            .method("POST")
            .uri("/leaderboards/most-wickets/refresh?season=all_time")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: LeaderboardRefreshResponse =
            serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body.category, LeaderboardCategory::MostWickets.to_string());
        assert_eq!(body.season, "all_time");
        assert_eq!(body.ranked, 1);

        let request = Request::builder()
            .method("POST")
            .uri("/leaderboards/most_catches/refresh")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
