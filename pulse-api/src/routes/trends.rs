//! Keyword trend endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use pulse_services::compute_trends;
use pulse_services::config::{DEFAULT_TREND_LIMIT, MAX_TREND_LIMIT};
use serde::Deserialize;

use super::{pulse_error_response, query_rejection_response};
use crate::AppState;

/// Query parameters for trends
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    /// Maximum number of keywords (1..=200)
    pub limit: Option<usize>,
}

/// Create trend routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/trends", get(get_trends))
}

/// GET /trends - ranked keyword trends over the last 24h, split at 12h
async fn get_trends(
    State(state): State<AppState>,
    params: Result<Query<TrendsQuery>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return query_rejection_response(rejection),
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TREND_LIMIT)
        .clamp(1, MAX_TREND_LIMIT);

    match compute_trends(
        &state.store,
        state.providers.keywords.as_ref(),
        &state.config,
        Utc::now(),
        limit,
    ) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => pulse_error_response(e),
    }
}
