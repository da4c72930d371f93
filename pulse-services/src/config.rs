//! Runtime configuration and pipeline constants

use std::env;

use chrono::Duration;
use serde::Serialize;

/// Minimum stored articles before any signal is computed
pub const MIN_ARTICLES_FOR_SIGNALS: usize = 5;
/// Minimum stored articles before topic discovery runs
pub const MIN_ARTICLES_FOR_TOPICS: usize = 15;
/// Minimum articles in the recent window before breaking news is assessed
pub const MIN_RECENT_FOR_BREAKING: usize = 3;

/// DBSCAN neighbourhood radius in cosine distance for article clusters
pub const CLUSTER_EPS: f64 = 0.3;
pub const CLUSTER_MIN_SAMPLES: usize = 2;
/// DBSCAN `min_samples` for topic discovery
pub const MIN_TOPIC_SIZE: usize = 3;
/// Topics group looser than same-story clusters
pub const TOPIC_EPS: f64 = 0.35;
pub const TOPIC_KEYWORDS: usize = 5;
pub const TOPIC_SAMPLE_ARTICLES: usize = 3;

/// Pairwise similarity counted as "same story" by the clustering sub-score
pub const BREAKING_PAIR_SIMILARITY: f64 = 0.7;
/// Minimum similarity for related-article lookups
pub const RELATED_SIMILARITY: f64 = 0.4;
pub const DEFAULT_RELATED_TOP_K: usize = 3;

pub const TREND_WINDOW_HOURS: i64 = 24;
pub const TREND_SPLIT_HOURS: i64 = 12;
pub const DEFAULT_TREND_LIMIT: usize = 50;
pub const MAX_TREND_LIMIT: usize = 200;

/// Breaking-news recent window length
pub const RECENT_WINDOW_HOURS: i64 = 1;
/// Breaking-news baseline window length, ending where the recent window starts
pub const BASELINE_WINDOW_HOURS: i64 = 12;

pub const DEFAULT_BREAKING_THRESHOLD: u8 = 60;

pub fn topic_ttl() -> Duration {
    Duration::minutes(30)
}

pub fn breaking_ttl() -> Duration {
    Duration::minutes(15)
}

/// Process configuration, read once at startup
#[derive(Debug, Clone, Serialize)]
pub struct PulseConfig {
    /// NewsAPI key; fetching is disabled when absent
    #[serde(skip_serializing)]
    pub news_api_key: Option<String>,
    pub newsapi_base_url: String,
    pub poll_country: String,
    pub poll_language: String,
    /// Scheduler interval, never below one minute
    pub poll_interval_minutes: u64,
    /// Retention window evaluated on `fetched_at`
    pub retention_hours: i64,
    pub sqlite_path: String,
    /// OpenAI key; the local hashing embedder is used when absent
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub breaking_threshold: u8,
    pub server_port: u16,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            news_api_key: None,
            newsapi_base_url: pulse_news::DEFAULT_BASE_URL.to_string(),
            poll_country: "us".to_string(),
            poll_language: "en".to_string(),
            poll_interval_minutes: 30,
            retention_hours: 48,
            sqlite_path: "data/news.db".to_string(),
            openai_api_key: None,
            breaking_threshold: DEFAULT_BREAKING_THRESHOLD,
            server_port: 8000,
        }
    }
}

impl PulseConfig {
    /// Load configuration from environment variables
    ///
    /// Expects (all optional):
    /// - NEWS_API_KEY, NEWSAPI_BASE_URL
    /// - POLL_COUNTRY, POLL_LANGUAGE, POLL_INTERVAL_MINUTES, RETENTION_HOURS
    /// - SQLITE_PATH, OPENAI_API_KEY, BREAKING_THRESHOLD, SERVER_PORT
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let poll_interval_minutes: u64 =
            parse_or(get("POLL_INTERVAL_MINUTES"), "POLL_INTERVAL_MINUTES", defaults.poll_interval_minutes)?;
        let retention_hours: i64 =
            parse_or(get("RETENTION_HOURS"), "RETENTION_HOURS", defaults.retention_hours)?;
        if retention_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "RETENTION_HOURS".to_string(),
                value: retention_hours.to_string(),
            });
        }
        let breaking_threshold: u8 =
            parse_or(get("BREAKING_THRESHOLD"), "BREAKING_THRESHOLD", defaults.breaking_threshold)?;
        if breaking_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "BREAKING_THRESHOLD".to_string(),
                value: breaking_threshold.to_string(),
            });
        }

        Ok(Self {
            news_api_key: get("NEWS_API_KEY"),
            newsapi_base_url: get("NEWSAPI_BASE_URL").unwrap_or(defaults.newsapi_base_url),
            poll_country: get("POLL_COUNTRY").unwrap_or(defaults.poll_country),
            poll_language: get("POLL_LANGUAGE").unwrap_or(defaults.poll_language),
            poll_interval_minutes: poll_interval_minutes.max(1),
            retention_hours,
            sqlite_path: get("SQLITE_PATH").unwrap_or(defaults.sqlite_path),
            openai_api_key: get("OPENAI_API_KEY"),
            breaking_threshold,
            server_port: parse_or(get("SERVER_PORT"), "SERVER_PORT", defaults.server_port)?,
        })
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_minutes.max(1) * 60)
    }

    pub fn retention(&self) -> Duration {
        Duration::hours(self.retention_hours)
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    field: &str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },
}

impl From<ConfigError> for pulse_core::PulseError {
    fn from(err: ConfigError) -> Self {
        pulse_core::PulseError::Config(err.to_string())
    }
}
