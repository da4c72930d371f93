//! NewsPulse API Server
//!
//! Runs the headline poller in the background and serves trends and cached
//! signals over a read-only HTTP API.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use pulse_news::{DisabledSource, HeadlineSource, NewsApiClient};
use pulse_services::{ArticleStore, HeadlinePoller, PulseConfig, ResultCache, SignalProviders};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
///
/// Handlers only read from the store and cache; the poller is their only writer.
#[derive(Clone)]
pub struct AppState {
    pub store: ArticleStore,
    pub cache: ResultCache,
    pub providers: SignalProviders,
    pub config: Arc<PulseConfig>,
}

/// Build the full router for `state`
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local, then .env
    for file in [".env.local", ".env"] {
        if let Err(e) = dotenvy::from_filename(file) {
            // Not an error if the file doesn't exist
            if !matches!(e, dotenvy::Error::Io(_)) {
                eprintln!("Warning: Failed to load {}: {}", file, e);
            }
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,pulse_api=debug,pulse_services=debug,tower_http=info")
            }),
        )
        .init();

    info!("Starting NewsPulse API");

    let config = PulseConfig::from_env()?;

    if let Some(parent) = Path::new(&config.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    info!("Opening article store and result cache at: {}", config.sqlite_path);
    let store = ArticleStore::open(&config.sqlite_path)?;
    let cache = ResultCache::open(&config.sqlite_path)?;

    let providers = SignalProviders::from_config(&config);

    let source: Arc<dyn HeadlineSource> = match &config.news_api_key {
        Some(key) => {
            info!("NewsAPI headline source enabled ({}/{})", config.poll_country, config.poll_language);
            Arc::new(NewsApiClient::with_base_url(key.clone(), config.newsapi_base_url.clone()))
        }
        None => {
            warn!("NEWS_API_KEY not set - headline fetching disabled, serving stored data only");
            Arc::new(DisabledSource)
        }
    };

    let poller = Arc::new(HeadlinePoller::new(
        source,
        store.clone(),
        cache.clone(),
        providers.clone(),
        &config,
    ));
    poller.start()?;

    let port = config.server_port;
    let state = AppState {
        store,
        cache,
        providers,
        config: Arc::new(config),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down headline poller");
    poller.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
