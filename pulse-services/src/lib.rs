//! Ingestion, signal computation and result caching for NewsPulse
//!
//! The [`HeadlinePoller`] is the single writer: it fetches headlines into the
//! [`ArticleStore`], applies retention and recomputes every signal into the
//! [`ResultCache`]. Request handlers only read from the store and the cache.

pub mod article_store;
pub mod breaking;
pub mod clustering;
pub mod config;
pub mod entities;
pub mod error;
pub mod keywords;
pub mod poller;
pub mod providers;
pub mod result_cache;
pub mod signal_processor;
pub mod topics;
pub mod trends;

pub use article_store::ArticleStore;
pub use breaking::{
    clustering_score, combined_score, novelty_score, select_representative, volume_score,
    BreakingScorer, BreakingWindows,
};
pub use clustering::{
    cluster_articles, clusters_from_assignments, dbscan, find_related, ClusteringResult, NOISE,
};
pub use config::{ConfigError, PulseConfig};
pub use entities::{
    extract_from_articles, EntityCount, EntityExtractor, EntityMention, EntityRanking,
    HeuristicEntityExtractor,
};
pub use error::{StoreError, StoreResult};
pub use keywords::{count_keywords, KeywordCounts, KeywordExtractor, PhraseExtractor};
pub use poller::{CycleReport, HeadlinePoller};
pub use providers::SignalProviders;
pub use result_cache::{CacheStatus, ResultCache};
pub use signal_processor::{SignalOutcome, SignalProcessor, SignalReport};
pub use topics::{TopicDiscovery, TopicModeler};
pub use trends::{compute_trends, rank_trends, TrendWindows};
