//! Embeddings and semantic similarity for NewsPulse
//!
//! This crate turns headline text into fixed-size vectors and compares them.
//!
//! ## Features
//! - `EmbeddingProvider` trait with an OpenAI-backed and a local hashing provider
//! - Cosine similarity and centroid calculation
//! - Related-article search over cached embeddings

pub mod client;
pub mod error;
pub mod hashing;
pub mod provider;
pub mod similarity;
pub mod types;

pub use client::OpenAiEmbedder;
pub use error::{EmbeddingError, Result};
pub use hashing::HashingEmbedder;
pub use provider::EmbeddingProvider;
pub use similarity::{centroid, cosine_similarity, find_similar};
pub use types::{EmbeddingVector, SimilarityMatch};
