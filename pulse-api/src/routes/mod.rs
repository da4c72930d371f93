//! API route definitions

mod health;
mod signals;
mod trends;

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use pulse_core::PulseError;
use tracing::error;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(trends::routes())
        .merge(signals::routes())
}

/// Structured error body: `{status: "error", code, message}`
pub(crate) fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "code": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed query string (bad number, out-of-range value)
pub(crate) fn query_rejection_response(rejection: QueryRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

/// Map a pipeline error to a response; insufficient data is not a server fault
pub(crate) fn pulse_error_response(err: PulseError) -> Response {
    let status = match err {
        PulseError::InsufficientData { .. } => StatusCode::OK,
        PulseError::Config(_) => StatusCode::BAD_REQUEST,
        _ => {
            error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.code(), err.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pulse_services::{ArticleStore, PulseConfig, ResultCache, SignalProviders};
    use tower::ServiceExt;

    use crate::AppState;

    pub fn state() -> AppState {
        let store = ArticleStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        let cache = ResultCache::open_in_memory().unwrap();
        cache.init_schema().unwrap();
        AppState {
            store,
            cache,
            providers: SignalProviders::local(),
            config: Arc::new(PulseConfig::default()),
        }
    }

    /// GET `uri` and return (status, JSON body)
    pub async fn get_json(state: AppState, uri: &str) -> (u16, serde_json::Value) {
        let response = crate::app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status().as_u16();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
