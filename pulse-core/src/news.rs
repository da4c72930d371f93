//! News data structures for headline ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored headline article, keyed by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Article URL (unique key)
    pub url: String,
    /// Article title
    pub title: String,
    /// Brief description/excerpt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Truncated content as delivered by the upstream API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Name of the news source (e.g., "Reuters")
    pub source_name: String,
    /// Publication date, authoritative for windowing
    pub published_at: DateTime<Utc>,
    /// When the poller last saw this article, authoritative for retention
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// Text fed to the embedding provider: title, then description if any
    pub fn embedding_text(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => format!("{}. {}", self.title, desc),
            _ => self.title.clone(),
        }
    }

    /// Title and description joined with a space, for entity/keyword extraction
    pub fn headline_text(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => format!("{} {}", self.title, desc),
            _ => self.title.clone(),
        }
    }

    pub fn to_ref(&self) -> ArticleRef {
        ArticleRef {
            title: self.title.clone(),
            url: self.url.clone(),
            source: self.source_name.clone(),
            published_at: self.published_at,
        }
    }
}

/// Article metadata as exposed in signal outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}
