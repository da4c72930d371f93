//! Core types for embeddings

use serde::{Deserialize, Serialize};

/// Embedding vector (1536 dimensions for text-embedding-3-small, 384 for the hashing provider)
pub type EmbeddingVector = Vec<f32>;

/// Similarity match result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Article URL
    pub url: String,
    /// Cosine similarity score (-1.0 - 1.0)
    pub score: f64,
}
