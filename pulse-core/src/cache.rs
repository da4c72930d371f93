//! Cache entry wrapper shared by the result cache and request handlers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A computed payload stamped with the time its computation finished.
///
/// The cache itself never expires entries; readers compare `computed_at`
/// against their own freshness budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub computed_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            computed_at: Utc::now(),
        }
    }

    pub fn with_time(payload: T, computed_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            computed_at,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.computed_at)
    }

    /// True when the entry is no older than `ttl` at `now`
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) <= ttl
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            payload: f(self.payload),
            computed_at: self.computed_at,
        }
    }
}

/// Independently computed and cached result kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// url → embedding vector
    Embeddings,
    /// url → cluster assignment
    ClusterAssignment,
    /// global topic summary plus url → topic assignment
    TopicSummary,
    /// global breaking-news assessment
    BreakingNews,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::Embeddings,
        CacheKind::ClusterAssignment,
        CacheKind::TopicSummary,
        CacheKind::BreakingNews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Embeddings => "embeddings",
            CacheKind::ClusterAssignment => "cluster_assignment",
            CacheKind::TopicSummary => "topic_summary",
            CacheKind::BreakingNews => "breaking_news",
        }
    }

    /// Whether entries of this kind are keyed by article url
    pub fn is_url_keyed(&self) -> bool {
        matches!(self, CacheKind::Embeddings | CacheKind::ClusterAssignment)
    }
}
