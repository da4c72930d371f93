//! Health check endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pulse_services::CacheStatus;
use serde::Serialize;

use super::error_response;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    articles: usize,
    cache: CacheStatus,
}

/// GET /health - store size and last computation time per cached signal
async fn health_check(State(state): State<AppState>) -> Response {
    match state.store.count() {
        Ok(articles) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                articles,
                cache: state.cache.status(),
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, "storage", e.to_string()),
    }
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get_json, state};

    #[tokio::test]
    async fn test_health_on_empty_state() {
        let (status, body) = get_json(state(), "/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["articles"], 0);
        assert!(body["cache"]["breaking_news"].is_null());
    }
}
