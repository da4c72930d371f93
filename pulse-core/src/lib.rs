//! Core types for the NewsPulse signal pipeline
//!
//! This crate defines the shared data structures used across the workspace:
//! stored articles, keyword trends, breaking-news / cluster / topic records
//! and the cache entry wrapper the request layer reads from.

pub mod cache;
pub mod error;
pub mod news;
pub mod signals;
pub mod trend;

pub use cache::{CacheEntry, CacheKind};
pub use error::{PulseError, PulseResult};
pub use news::{Article, ArticleRef};
pub use signals::{
    ArticleCluster, BreakingAssessment, BreakingSignals, ClusterAssignment, EntityType,
    TopicAssignment, TopicInfo, TopicSummary,
};
pub use trend::{compute_growth, TrendEntry, TrendItem, TrendMeta, TrendReport};
