//! NewsAPI wire types

use chrono::{DateTime, Utc};
use pulse_core::Article;
use serde::Deserialize;

/// `top-headlines` response body
#[derive(Debug, Deserialize)]
pub struct NewsApiResponse {
    pub status: String,
    #[serde(rename = "totalResults")]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
}

/// Article source reference
#[derive(Debug, Clone, Deserialize)]
pub struct NewsApiSource {
    pub id: Option<String>,
    pub name: String,
}

/// A single article record as delivered by NewsAPI
#[derive(Debug, Clone, Deserialize)]
pub struct NewsApiArticle {
    pub source: NewsApiSource,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub content: Option<String>,
}

/// Error body returned with non-200 responses
#[derive(Debug, Deserialize)]
pub struct NewsApiErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl NewsApiArticle {
    /// Convert into a stored article stamped with the poll's fetch time.
    ///
    /// Returns `None` when `publishedAt` is not a valid RFC 3339 timestamp.
    pub fn into_article(self, fetched_at: DateTime<Utc>) -> Option<Article> {
        let published_at = DateTime::parse_from_rfc3339(&self.published_at)
            .ok()?
            .with_timezone(&Utc);

        Some(Article {
            url: self.url,
            title: self.title,
            description: self.description,
            content: self.content,
            source_name: self.source.name,
            published_at,
            fetched_at,
        })
    }
}
