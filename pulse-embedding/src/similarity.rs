//! Cosine similarity calculations

use ndarray::{Array1, ArrayView1};
use tracing::debug;

use crate::types::{EmbeddingVector, SimilarityMatch};

/// Calculate cosine similarity between two embeddings
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical), or 0.0 when
/// the dimensions differ or either vector has zero magnitude.
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        debug!(
            "Embedding dimension mismatch ({} vs {}), similarity 0",
            a.len(),
            b.len()
        );
        return 0.0;
    }

    let a_view = ArrayView1::from(a);
    let b_view = ArrayView1::from(b);

    let dot_product = a_view.dot(&b_view);
    let norm_a = a_view.dot(&a_view).sqrt();
    let norm_b = b_view.dot(&b_view).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)) as f64
}

/// Element-wise mean of a set of equally sized embeddings
///
/// Returns `None` for an empty set or mixed dimensions.
pub fn centroid(embeddings: &[&[f32]]) -> Option<EmbeddingVector> {
    let first = embeddings.first()?;
    let dimension = first.len();

    let mut sum = Array1::<f32>::zeros(dimension);
    for embedding in embeddings {
        if embedding.len() != dimension {
            return None;
        }
        sum += &ArrayView1::from(*embedding);
    }

    sum /= embeddings.len() as f32;
    Some(sum.to_vec())
}

/// Find top-K most similar articles for a target embedding
///
/// # Arguments
/// * `target_url` - URL of the target article (excluded from results)
/// * `target` - The target embedding vector
/// * `candidates` - List of (url, embedding) pairs
/// * `top_k` - Maximum number of results to return
/// * `threshold` - Minimum similarity score
///
/// # Returns
/// Vector of SimilarityMatch sorted by score (highest first)
pub fn find_similar(
    target_url: &str,
    target: &[f32],
    candidates: &[(String, EmbeddingVector)],
    top_k: usize,
    threshold: f64,
) -> Vec<SimilarityMatch> {
    debug!(
        "Finding similar articles: {} candidates, top_k={}, threshold={}",
        candidates.len(),
        top_k,
        threshold
    );

    let mut matches: Vec<SimilarityMatch> = candidates
        .iter()
        .filter(|(url, _)| url != target_url)
        .map(|(url, embedding)| SimilarityMatch {
            url: url.clone(),
            score: cosine_similarity(target, embedding),
        })
        .filter(|m| m.score >= threshold)
        .collect();

    // Sort by score descending, url as tie-break for stable output
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.url.cmp(&b.url))
    });

    matches.truncate(top_k);

    if let Some(top) = matches.first() {
        debug!("Top match: url={}, score={:.3}", top.url, top.score);
    }

    matches
}
