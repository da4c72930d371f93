//! Embedding provider seam

use async_trait::async_trait;

use crate::{error::Result, types::EmbeddingVector};

/// Turns text into fixed-size vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// each of length `dimension()`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model or provider name used in logs
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    async fn embed_text(&self, text: &str) -> Result<EmbeddingVector> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or(crate::error::EmbeddingError::CountMismatch { expected: 1, actual: 0 })
    }
}
