//! Topic discovery
//!
//! Groups the stored articles into topics with DBSCAN over their embeddings
//! and describes each topic by its most frequent keywords.

use std::collections::HashMap;

use pulse_core::{Article, PulseError, PulseResult, TopicAssignment, TopicInfo, TopicSummary};
use pulse_embedding::EmbeddingVector;
use tracing::{debug, instrument};

use crate::clustering::{dbscan, NOISE};
use crate::config::{
    MIN_ARTICLES_FOR_TOPICS, MIN_TOPIC_SIZE, TOPIC_EPS, TOPIC_KEYWORDS, TOPIC_SAMPLE_ARTICLES,
};
use crate::keywords::{count_keywords, KeywordExtractor};

/// Topics plus the per-article assignment map
#[derive(Debug, Clone)]
pub struct TopicDiscovery {
    pub summary: TopicSummary,
    pub assignments: HashMap<String, TopicAssignment>,
}

/// Title-case each word: "climate summit" → "Climate Summit"
fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Label from the first three keywords, e.g. "Climate Summit • Paris • Emission"
pub fn topic_label(keywords: &[String], topic_id: i64) -> String {
    if keywords.is_empty() {
        return format!("Topic {}", topic_id);
    }
    keywords
        .iter()
        .take(3)
        .map(|k| title_case(k))
        .collect::<Vec<_>>()
        .join(" • ")
}

/// Discovers topics from article embeddings
pub struct TopicModeler<'a> {
    extractor: &'a dyn KeywordExtractor,
    eps: f64,
    min_topic_size: usize,
}

impl<'a> TopicModeler<'a> {
    pub fn new(extractor: &'a dyn KeywordExtractor) -> Self {
        Self {
            extractor,
            eps: TOPIC_EPS,
            min_topic_size: MIN_TOPIC_SIZE,
        }
    }

    pub fn with_params(mut self, eps: f64, min_topic_size: usize) -> Self {
        self.eps = eps;
        self.min_topic_size = min_topic_size;
        self
    }

    /// Group `articles` into topics
    ///
    /// Fails with `InsufficientData` below the minimum article count and with
    /// a computation error when every article is noise.
    #[instrument(skip_all, fields(articles = articles.len()))]
    pub fn discover(
        &self,
        articles: &[Article],
        embeddings: &HashMap<String, EmbeddingVector>,
    ) -> PulseResult<TopicDiscovery> {
        if articles.len() < MIN_ARTICLES_FOR_TOPICS {
            return Err(PulseError::insufficient(MIN_ARTICLES_FOR_TOPICS, articles.len()));
        }

        let embedded: Vec<(&Article, &[f32])> = articles
            .iter()
            .filter_map(|a| embeddings.get(&a.url).map(|e| (a, e.as_slice())))
            .collect();
        if embedded.len() < MIN_ARTICLES_FOR_TOPICS {
            return Err(PulseError::insufficient(MIN_ARTICLES_FOR_TOPICS, embedded.len()));
        }

        let vectors: Vec<&[f32]> = embedded.iter().map(|(_, e)| *e).collect();
        let labels = dbscan(&vectors, self.eps, self.min_topic_size);

        let mut grouped: HashMap<i64, Vec<&Article>> = HashMap::new();
        let mut uncategorized_count = 0;
        for ((article, _), label) in embedded.iter().zip(&labels) {
            if *label == NOISE {
                uncategorized_count += 1;
            } else {
                grouped.entry(*label).or_default().push(*article);
            }
        }

        if grouped.is_empty() {
            return Err(PulseError::computation("topics", "no topics discovered"));
        }

        // Largest first; renumber so ids follow the published order
        let mut groups: Vec<(i64, Vec<&Article>)> = grouped.into_iter().collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

        let mut topics = Vec::with_capacity(groups.len());
        let mut assignments = HashMap::new();

        for (topic_id, (_, members)) in groups.into_iter().enumerate() {
            let topic_id = topic_id as i64;
            let texts: Vec<String> = members.iter().map(|a| a.headline_text()).collect();
            let keywords: Vec<String> = count_keywords(self.extractor, &texts)
                .most_common(TOPIC_KEYWORDS)
                .into_iter()
                .map(|(keyword, _)| keyword)
                .collect();
            let label = topic_label(&keywords, topic_id);

            for article in &members {
                assignments.insert(
                    article.url.clone(),
                    TopicAssignment {
                        topic_id,
                        topic_label: label.clone(),
                        keywords: keywords.clone(),
                    },
                );
            }

            topics.push(TopicInfo {
                topic_id,
                label,
                keywords,
                article_count: members.len(),
                sample_articles: members
                    .iter()
                    .take(TOPIC_SAMPLE_ARTICLES)
                    .map(|a| a.to_ref())
                    .collect(),
            });
        }

        debug!(
            "Discovered {} topics over {} articles ({} uncategorized)",
            topics.len(),
            embedded.len(),
            uncategorized_count
        );

        Ok(TopicDiscovery {
            summary: TopicSummary {
                topics,
                total_articles: embedded.len(),
                uncategorized_count,
            },
            assignments,
        })
    }
}
