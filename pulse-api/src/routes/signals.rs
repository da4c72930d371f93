//! Cached signal endpoints: breaking news, clusters, topics, entities, related
//!
//! Everything here reads the result cache or the article store. Before the
//! first completed computation a kind answers with an `in_progress`
//! placeholder, never an error.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use pulse_services::config::{breaking_ttl, topic_ttl, DEFAULT_RELATED_TOP_K, RELATED_SIMILARITY};
use pulse_services::{clusters_from_assignments, extract_from_articles, find_related};
use serde::Deserialize;
use serde_json::json;

use super::{error_response, pulse_error_response, query_rejection_response};
use crate::AppState;

const MAX_RELATED_TOP_K: usize = 20;
const DEFAULT_ENTITY_LIMIT: usize = 10;
const MAX_ENTITY_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct BreakingQuery {
    /// Minimum combined score (0..=100)
    pub threshold: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct EntitiesQuery {
    /// Entities per type
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub url: Option<String>,
    pub top_k: Option<usize>,
}

/// Create signal routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/breaking", get(get_breaking))
        .route("/clusters", get(get_clusters))
        .route("/topics", get(get_topics))
        .route("/entities", get(get_entities))
        .route("/related", get(get_related))
}

fn in_progress(field: &str, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            field: [],
            "status": "in_progress",
            "message": message,
        })),
    )
        .into_response()
}

/// GET /breaking?threshold=T - cached breaking story if its score reaches T
async fn get_breaking(
    State(state): State<AppState>,
    params: Result<Query<BreakingQuery>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return query_rejection_response(rejection),
    };
    let threshold = params
        .threshold
        .unwrap_or(state.config.breaking_threshold)
        .min(100);

    let Some(entry) = state.cache.breaking() else {
        return in_progress("breaking", "Breaking news detection has not completed yet");
    };

    let stale = !entry.is_fresh(breaking_ttl(), Utc::now());
    let breaking = if entry.payload.meets(threshold) {
        vec![&entry.payload]
    } else {
        Vec::new()
    };

    (
        StatusCode::OK,
        Json(json!({
            "breaking": breaking,
            "threshold": threshold,
            "computed_at": entry.computed_at,
            "stale": stale,
        })),
    )
        .into_response()
}

/// GET /clusters - story clusters from the cached assignments
async fn get_clusters(State(state): State<AppState>) -> Response {
    let Some(entry) = state.cache.cluster_assignments() else {
        return in_progress("clusters", "Article clustering has not completed yet");
    };

    let articles = match state.store.all_articles() {
        Ok(articles) => articles,
        Err(e) => return pulse_error_response(e.into()),
    };
    let clusters = clusters_from_assignments(&articles, &entry.payload);

    (
        StatusCode::OK,
        Json(json!({
            "total_clusters": clusters.len(),
            "clusters": clusters,
            "computed_at": entry.computed_at,
        })),
    )
        .into_response()
}

/// GET /topics - cached topic summary
async fn get_topics(State(state): State<AppState>) -> Response {
    let Some(entry) = state.cache.topics() else {
        return in_progress("topics", "Topic discovery has not completed yet");
    };

    let stale = !entry.is_fresh(topic_ttl(), Utc::now());
    let summary = entry.payload;

    (
        StatusCode::OK,
        Json(json!({
            "topics": summary.topics,
            "total_articles": summary.total_articles,
            "uncategorized_count": summary.uncategorized_count,
            "computed_at": entry.computed_at,
            "stale": stale,
        })),
    )
        .into_response()
}

/// GET /entities?limit=N - most mentioned entities per type over stored articles
async fn get_entities(
    State(state): State<AppState>,
    params: Result<Query<EntitiesQuery>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return query_rejection_response(rejection),
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ENTITY_LIMIT)
        .clamp(1, MAX_ENTITY_LIMIT);

    let articles = match state.store.all_articles() {
        Ok(articles) => articles,
        Err(e) => return pulse_error_response(e.into()),
    };

    let mut ranking = extract_from_articles(state.providers.entities.as_ref(), &articles);
    for list in ranking.values_mut() {
        list.truncate(limit);
    }

    (
        StatusCode::OK,
        Json(json!({
            "entities": ranking,
            "article_count": articles.len(),
        })),
    )
        .into_response()
}

/// GET /related?url=U&top_k=K - stored articles similar to U
async fn get_related(
    State(state): State<AppState>,
    params: Result<Query<RelatedQuery>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return query_rejection_response(rejection),
    };
    let url = match params.url {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Query parameter 'url' is required",
            )
        }
    };
    let top_k = params
        .top_k
        .unwrap_or(DEFAULT_RELATED_TOP_K)
        .clamp(1, MAX_RELATED_TOP_K);

    let embeddings = state.cache.embeddings();
    let matches = find_related(&url, &embeddings, top_k, RELATED_SIMILARITY);

    let mut related = Vec::with_capacity(matches.len());
    for m in matches {
        match state.store.get_article(&m.url) {
            Ok(Some(article)) => related.push(json!({
                "title": article.title,
                "url": article.url,
                "source": article.source_name,
                "published_at": article.published_at,
                "similarity": m.score,
            })),
            Ok(None) => {}
            Err(e) => return pulse_error_response(e.into()),
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "url": url,
            "related": related,
        })),
    )
        .into_response()
}
