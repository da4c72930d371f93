//! Signal Processor
//!
//! Recomputes every cached signal from the current article set. Each kind is
//! computed and published independently: a failure in one never prevents the
//! others from running.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use pulse_core::{Article, PulseError, PulseResult};
use pulse_embedding::EmbeddingVector;
use tracing::{debug, info, instrument, warn};

use crate::article_store::ArticleStore;
use crate::breaking::BreakingScorer;
use crate::clustering::cluster_articles;
use crate::config::{CLUSTER_EPS, CLUSTER_MIN_SAMPLES, MIN_ARTICLES_FOR_SIGNALS};
use crate::providers::SignalProviders;
use crate::result_cache::ResultCache;
use crate::topics::TopicModeler;

/// What happened to one signal kind in a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// Computed and published; carries a kind-specific count
    Computed(usize),
    /// Not enough data; the previous cached value stays
    Skipped(String),
    Failed(String),
}

impl SignalOutcome {
    fn from_result(kind: &str, result: PulseResult<usize>) -> Self {
        match result {
            Ok(n) => SignalOutcome::Computed(n),
            Err(e @ PulseError::InsufficientData { .. }) => {
                debug!("Skipping {}: {}", kind, e);
                SignalOutcome::Skipped(e.to_string())
            }
            Err(e) => {
                warn!("Failed to compute {}: {}", kind, e);
                SignalOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, SignalOutcome::Computed(_))
    }
}

impl fmt::Display for SignalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalOutcome::Computed(n) => write!(f, "computed({})", n),
            SignalOutcome::Skipped(_) => write!(f, "skipped"),
            SignalOutcome::Failed(_) => write!(f, "failed"),
        }
    }
}

/// Per-kind results of one processing pass
#[derive(Debug, Clone)]
pub struct SignalReport {
    pub articles: usize,
    /// Newly embedded articles
    pub embeddings: SignalOutcome,
    /// Clusters found
    pub clusters: SignalOutcome,
    /// Topics found
    pub topics: SignalOutcome,
    /// Combined breaking score
    pub breaking: SignalOutcome,
    /// Cache entries evicted for urls no longer stored
    pub evicted: usize,
}

pub struct SignalProcessor {
    store: ArticleStore,
    cache: ResultCache,
    providers: SignalProviders,
    breaking_threshold: u8,
}

impl SignalProcessor {
    pub fn new(
        store: ArticleStore,
        cache: ResultCache,
        providers: SignalProviders,
        breaking_threshold: u8,
    ) -> Self {
        Self {
            store,
            cache,
            providers,
            breaking_threshold,
        }
    }

    /// Recompute all signals at `now` and drop cache entries for removed articles
    #[instrument(skip(self))]
    pub async fn process_all(&self, now: DateTime<Utc>) -> PulseResult<SignalReport> {
        let articles = self.store.all_articles()?;

        let mut report = if articles.len() < MIN_ARTICLES_FOR_SIGNALS {
            let reason =
                PulseError::insufficient(MIN_ARTICLES_FOR_SIGNALS, articles.len()).to_string();
            info!("Skipping signal processing: {}", reason);
            SignalReport {
                articles: articles.len(),
                embeddings: SignalOutcome::Skipped(reason.clone()),
                clusters: SignalOutcome::Skipped(reason.clone()),
                topics: SignalOutcome::Skipped(reason.clone()),
                breaking: SignalOutcome::Skipped(reason),
                evicted: 0,
            }
        } else {
            self.compute_signals(&articles, now).await
        };

        report.evicted = self.cache.evict_stale(&self.store.article_urls()?)?;

        info!(
            "Signals processed for {} articles: embeddings={} clusters={} topics={} breaking={} evicted={}",
            report.articles,
            report.embeddings,
            report.clusters,
            report.topics,
            report.breaking,
            report.evicted
        );
        Ok(report)
    }

    async fn compute_signals(&self, articles: &[Article], now: DateTime<Utc>) -> SignalReport {
        let embeddings = SignalOutcome::from_result("embeddings", self.refresh_embeddings(articles).await);

        // Whatever is cached, including vectors from earlier cycles
        let vectors = self.current_embeddings();

        let clusters = SignalOutcome::from_result("clusters", self.refresh_clusters(articles, &vectors));
        let topics = SignalOutcome::from_result("topics", self.refresh_topics(articles, &vectors));
        let breaking = SignalOutcome::from_result("breaking news", self.refresh_breaking(&vectors, now));

        SignalReport {
            articles: articles.len(),
            embeddings,
            clusters,
            topics,
            breaking,
            evicted: 0,
        }
    }

    /// Cached embeddings produced by the current provider
    fn current_embeddings(&self) -> HashMap<String, EmbeddingVector> {
        let dimension = self.providers.embedder.dimension();
        self.cache
            .embeddings()
            .into_iter()
            .filter(|(_, e)| e.len() == dimension)
            .collect()
    }

    /// Embed articles with no usable cached vector
    async fn refresh_embeddings(&self, articles: &[Article]) -> PulseResult<usize> {
        let cached = self.current_embeddings();
        let missing: Vec<&Article> = articles
            .iter()
            .filter(|a| !cached.contains_key(&a.url))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = missing.iter().map(|a| a.embedding_text()).collect();
        let vectors = self.providers.embedder.embed_batch(&texts).await?;

        let entries: HashMap<String, EmbeddingVector> = missing
            .iter()
            .map(|a| a.url.clone())
            .zip(vectors)
            .collect();
        let count = entries.len();
        self.cache.put_embeddings(entries)?;
        debug!("Embedded {} new articles with {}", count, self.providers.embedder.name());
        Ok(count)
    }

    fn refresh_clusters(
        &self,
        articles: &[Article],
        embeddings: &HashMap<String, EmbeddingVector>,
    ) -> PulseResult<usize> {
        let result = cluster_articles(articles, embeddings, CLUSTER_EPS, CLUSTER_MIN_SAMPLES);
        if result.assignments.is_empty() {
            return Err(PulseError::computation("clusters", "no embedded articles"));
        }
        let count = result.clusters.len();
        self.cache.put_clusters(result.assignments)?;
        Ok(count)
    }

    fn refresh_topics(
        &self,
        articles: &[Article],
        embeddings: &HashMap<String, EmbeddingVector>,
    ) -> PulseResult<usize> {
        let discovery =
            TopicModeler::new(self.providers.keywords.as_ref()).discover(articles, embeddings)?;
        let count = discovery.summary.topics.len();
        self.cache.put_topics(discovery.summary, discovery.assignments)?;
        Ok(count)
    }

    fn refresh_breaking(
        &self,
        embeddings: &HashMap<String, EmbeddingVector>,
        now: DateTime<Utc>,
    ) -> PulseResult<usize> {
        let assessment = BreakingScorer::new(self.providers.entities.as_ref(), self.breaking_threshold)
            .assess_at(&self.store, embeddings, now)?;
        let score = assessment.score as usize;
        self.cache.put_breaking(assessment)?;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use pulse_embedding::{EmbeddingError, EmbeddingProvider};
    use std::sync::Arc;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            8
        }

        async fn embed_batch(&self, _texts: &[String]) -> pulse_embedding::Result<Vec<EmbeddingVector>> {
            Err(EmbeddingError::Config("provider offline".to_string()))
        }
    }

    fn article(i: usize, title: &str, minutes_ago: i64, now: DateTime<Utc>) -> Article {
        Article {
            url: format!("https://news.test/{}", i),
            title: title.to_string(),
            description: Some("Officials confirmed the details on Tuesday".to_string()),
            content: None,
            source_name: "Wire".to_string(),
            published_at: now - Duration::minutes(minutes_ago),
            fetched_at: now,
        }
    }

    fn setup(articles: &[Article], providers: SignalProviders) -> (ArticleStore, ResultCache, SignalProcessor) {
        let store = ArticleStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store.upsert_articles(articles).unwrap();
        let cache = ResultCache::open_in_memory().unwrap();
        cache.init_schema().unwrap();
        let processor = SignalProcessor::new(store.clone(), cache.clone(), providers, 60);
        (store, cache, processor)
    }

    #[tokio::test]
    async fn test_below_minimum_computes_nothing() {
        let now = Utc::now();
        let articles: Vec<Article> = (0..4).map(|i| article(i, "Flood warning issued", 10, now)).collect();
        let (_, cache, processor) = setup(&articles, SignalProviders::local());

        let report = processor.process_all(now).await.unwrap();

        assert_eq!(report.articles, 4);
        assert!(matches!(report.embeddings, SignalOutcome::Skipped(_)));
        assert!(cache.embeddings().is_empty());
        assert!(cache.breaking().is_none());
    }

    #[tokio::test]
    async fn test_burst_populates_cache() {
        let now = Utc::now();
        let articles: Vec<Article> = (0..6)
            .map(|i| article(i, "Flood warning issued for Lagos", i as i64 * 5 + 1, now))
            .collect();
        let (_, cache, processor) = setup(&articles, SignalProviders::local());

        let report = processor.process_all(now).await.unwrap();

        assert_eq!(report.embeddings, SignalOutcome::Computed(6));
        assert_eq!(report.clusters, SignalOutcome::Computed(1));
        // Fewer than 15 articles
        assert!(matches!(report.topics, SignalOutcome::Skipped(_)));
        assert!(report.breaking.is_computed());

        assert_eq!(cache.embeddings().len(), 6);
        let clusters = cache.cluster_assignments().unwrap();
        assert!(clusters.payload.values().all(|a| a.cluster_size == 6));
        let breaking = cache.breaking().unwrap().payload;
        assert_eq!(breaking.recent_count, 6);
        assert_eq!(breaking.signals.clustering, 100.0);

        // Second pass only embeds what is new
        let again = processor.process_all(now).await.unwrap();
        assert_eq!(again.embeddings, SignalOutcome::Computed(0));
    }

    #[tokio::test]
    async fn test_embedding_failure_does_not_block_breaking() {
        let now = Utc::now();
        let articles: Vec<Article> = (0..5)
            .map(|i| article(i, "Flood warning issued for Lagos", i as i64 * 5 + 1, now))
            .collect();
        let providers = SignalProviders {
            embedder: Arc::new(FailingEmbedder),
            ..SignalProviders::local()
        };
        let (_, cache, processor) = setup(&articles, providers);

        let report = processor.process_all(now).await.unwrap();

        assert!(matches!(report.embeddings, SignalOutcome::Failed(_)));
        assert!(matches!(report.clusters, SignalOutcome::Failed(_)));
        assert!(report.breaking.is_computed());
        assert!(cache.cluster_assignments().is_none());
        assert_eq!(cache.breaking().unwrap().payload.signals.clustering, 0.0);
    }

    #[tokio::test]
    async fn test_evicts_entries_for_removed_articles() {
        let now = Utc::now();
        let mut articles: Vec<Article> = (0..5)
            .map(|i| article(i, "Flood warning issued for Lagos", 30, now))
            .collect();
        articles[0].fetched_at = now - Duration::hours(72);
        let (store, cache, processor) = setup(&articles, SignalProviders::local());

        processor.process_all(now).await.unwrap();
        assert_eq!(cache.embeddings().len(), 5);

        store.delete_fetched_before(now - Duration::hours(48)).unwrap();
        let report = processor.process_all(now).await.unwrap();

        assert!(report.evicted >= 1);
        assert!(cache.embedding("https://news.test/0").is_none());
    }
}
