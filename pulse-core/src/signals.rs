//! Derived signal records: breaking news, clusters, topics, entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::news::ArticleRef;

/// Named-entity categories produced by the entity extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Gpe,
    Event,
    Product,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Person,
        EntityType::Org,
        EntityType::Gpe,
        EntityType::Event,
        EntityType::Product,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Gpe => "GPE",
            EntityType::Event => "EVENT",
            EntityType::Product => "PRODUCT",
        }
    }

    /// Weight of a novel entity of this type in the breaking-news novelty score.
    ///
    /// PRODUCT is extracted but never weighted.
    pub fn novelty_weight(&self) -> Option<u32> {
        match self {
            EntityType::Person => Some(3),
            EntityType::Org => Some(2),
            EntityType::Gpe => Some(2),
            EntityType::Event => Some(4),
            EntityType::Product => None,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three breaking-news sub-scores, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakingSignals {
    pub volume: f64,
    pub novelty: f64,
    pub clustering: f64,
}

/// One detection cycle's breaking-news result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingAssessment {
    /// Combined score in [0, 100]
    pub score: u8,
    pub signals: BreakingSignals,
    pub recent_count: usize,
    pub baseline_count: usize,
    /// Article closest to the centroid of the recent burst
    pub representative: ArticleRef,
    /// Up to 5 recent article urls
    pub related_urls: Vec<String>,
    /// Up to 10 entity names new in the recent window
    pub novel_entities: Vec<String>,
    /// Whether `score` met the configured threshold at detection time
    pub is_breaking: bool,
    pub detected_at: DateTime<Utc>,
}

impl BreakingAssessment {
    pub fn meets(&self, threshold: u8) -> bool {
        self.score >= threshold
    }
}

/// Cluster membership of a single article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster_id: i64,
    pub cluster_size: usize,
}

/// A group of semantically close articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCluster {
    pub cluster_id: i64,
    pub article_count: usize,
    pub articles: Vec<ArticleRef>,
}

/// A discovered topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub topic_id: i64,
    /// Top three keywords, title-cased and joined with " • "
    pub label: String,
    pub keywords: Vec<String>,
    pub article_count: usize,
    pub sample_articles: Vec<ArticleRef>,
}

/// Global topic discovery result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topics: Vec<TopicInfo>,
    pub total_articles: usize,
    /// Articles that fell into no topic
    pub uncategorized_count: usize,
}

/// Topic membership of a single article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAssignment {
    pub topic_id: i64,
    pub topic_label: String,
    pub keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_novelty_weights() {
        assert_eq!(EntityType::Event.novelty_weight(), Some(4));
        assert_eq!(EntityType::Person.novelty_weight(), Some(3));
        assert_eq!(EntityType::Org.novelty_weight(), Some(2));
        assert_eq!(EntityType::Gpe.novelty_weight(), Some(2));
        assert_eq!(EntityType::Product.novelty_weight(), None);
    }

    #[test]
    fn test_entity_type_serializes_uppercase() {
        let json = serde_json::to_string(&EntityType::Gpe).unwrap();
        assert_eq!(json, "\"GPE\"");
        assert_eq!(EntityType::Product.to_string(), "PRODUCT");
    }
}
