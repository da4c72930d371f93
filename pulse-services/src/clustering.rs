//! Density clustering over article embeddings
//!
//! DBSCAN with cosine distance (`1 - cosine_similarity`). A point's
//! neighbourhood includes the point itself, so `min_samples = 2` means "at
//! least one other article within `eps`".

use std::collections::{HashMap, VecDeque};

use pulse_core::{Article, ArticleCluster, ClusterAssignment};
use pulse_embedding::{cosine_similarity, find_similar, EmbeddingVector, SimilarityMatch};
use tracing::debug;

/// Label given to points that belong to no cluster
pub const NOISE: i64 = -1;

/// Assign a cluster label to every embedding
///
/// Cluster ids are dense, starting at 0, in order of discovery. Noise is
/// labelled [`NOISE`].
pub fn dbscan<V: AsRef<[f32]>>(embeddings: &[V], eps: f64, min_samples: usize) -> Vec<i64> {
    let n = embeddings.len();
    let neighbours: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| {
                    i == j
                        || 1.0 - cosine_similarity(embeddings[i].as_ref(), embeddings[j].as_ref())
                            <= eps
                })
                .collect()
        })
        .collect();
    let is_core = |i: usize| neighbours[i].len() >= min_samples.max(1);

    let mut labels: Vec<Option<i64>> = vec![None; n];
    let mut next_id = 0i64;

    for point in 0..n {
        if labels[point].is_some() {
            continue;
        }
        if !is_core(point) {
            labels[point] = Some(NOISE);
            continue;
        }

        let cluster_id = next_id;
        next_id += 1;
        labels[point] = Some(cluster_id);

        let mut queue: VecDeque<usize> = neighbours[point].iter().copied().collect();
        while let Some(q) = queue.pop_front() {
            match labels[q] {
                // Border point previously marked as noise
                Some(NOISE) => labels[q] = Some(cluster_id),
                Some(_) => {}
                None => {
                    labels[q] = Some(cluster_id);
                    if is_core(q) {
                        queue.extend(neighbours[q].iter().copied());
                    }
                }
            }
        }
    }

    labels.into_iter().map(|l| l.unwrap_or(NOISE)).collect()
}

/// Outcome of clustering one article set
#[derive(Debug, Clone, Default)]
pub struct ClusteringResult {
    /// Non-noise clusters, largest first
    pub clusters: Vec<ArticleCluster>,
    /// Every embedded article's assignment; noise is `cluster_id = -1`, size 1
    pub assignments: HashMap<String, ClusterAssignment>,
    pub noise_count: usize,
}

/// Cluster the articles that have an embedding
///
/// Articles without an embedding are skipped. Within a cluster, articles keep
/// their input order.
pub fn cluster_articles(
    articles: &[Article],
    embeddings: &HashMap<String, EmbeddingVector>,
    eps: f64,
    min_samples: usize,
) -> ClusteringResult {
    let embedded: Vec<(&Article, &EmbeddingVector)> = articles
        .iter()
        .filter_map(|a| embeddings.get(&a.url).map(|e| (a, e)))
        .collect();
    let vectors: Vec<&[f32]> = embedded.iter().map(|(_, e)| e.as_slice()).collect();
    let labels = dbscan(&vectors, eps, min_samples);

    let mut grouped: HashMap<i64, Vec<&Article>> = HashMap::new();
    for ((article, _), label) in embedded.iter().zip(&labels) {
        grouped.entry(*label).or_default().push(*article);
    }

    let noise_count = grouped.get(&NOISE).map_or(0, Vec::len);
    let mut assignments = HashMap::with_capacity(embedded.len());
    let mut clusters = Vec::new();

    for (cluster_id, members) in &grouped {
        let cluster_size = if *cluster_id == NOISE { 1 } else { members.len() };
        for article in members {
            assignments.insert(
                article.url.clone(),
                ClusterAssignment {
                    cluster_id: *cluster_id,
                    cluster_size,
                },
            );
        }
        if *cluster_id != NOISE {
            clusters.push(ArticleCluster {
                cluster_id: *cluster_id,
                article_count: members.len(),
                articles: members.iter().map(|a| a.to_ref()).collect(),
            });
        }
    }

    clusters.sort_by(|a, b| {
        b.article_count
            .cmp(&a.article_count)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });

    debug!(
        "Clustered {} articles into {} clusters ({} noise)",
        embedded.len(),
        clusters.len(),
        noise_count
    );

    ClusteringResult {
        clusters,
        assignments,
        noise_count,
    }
}

/// Rebuild cluster groups from cached assignments
///
/// Used by readers that hold the url → assignment map but not the labels.
pub fn clusters_from_assignments(
    articles: &[Article],
    assignments: &HashMap<String, ClusterAssignment>,
) -> Vec<ArticleCluster> {
    let mut grouped: HashMap<i64, Vec<&Article>> = HashMap::new();
    for article in articles {
        if let Some(assignment) = assignments.get(&article.url) {
            if assignment.cluster_id != NOISE {
                grouped.entry(assignment.cluster_id).or_default().push(article);
            }
        }
    }

    let mut clusters: Vec<ArticleCluster> = grouped
        .into_iter()
        .map(|(cluster_id, members)| ArticleCluster {
            cluster_id,
            article_count: members.len(),
            articles: members.iter().map(|a| a.to_ref()).collect(),
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.article_count
            .cmp(&a.article_count)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });
    clusters
}

/// Articles most similar to `target_url` among the cached embeddings
///
/// Returns an empty list when the target has no embedding.
pub fn find_related(
    target_url: &str,
    embeddings: &HashMap<String, EmbeddingVector>,
    top_k: usize,
    threshold: f64,
) -> Vec<SimilarityMatch> {
    let Some(target) = embeddings.get(target_url) else {
        return Vec::new();
    };

    let mut candidates: Vec<(String, EmbeddingVector)> = embeddings
        .iter()
        .map(|(url, e)| (url.clone(), e.clone()))
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    find_similar(target_url, target, &candidates, top_k, threshold)
}

/// Share of unordered pairs whose similarity is at least `threshold`
///
/// Zero when there are fewer than two embeddings.
pub fn similar_pair_share<V: AsRef<[f32]>>(embeddings: &[V], threshold: f64) -> f64 {
    let n = embeddings.len();
    if n < 2 {
        return 0.0;
    }

    let mut similar = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            if cosine_similarity(embeddings[i].as_ref(), embeddings[j].as_ref()) >= threshold {
                similar += 1;
            }
        }
    }

    let total = n * (n - 1) / 2;
    similar as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(url: &str) -> Article {
        let now = Utc::now();
        Article {
            url: url.to_string(),
            title: format!("Title for {}", url),
            description: None,
            content: None,
            source_name: "Wire".to_string(),
            published_at: now,
            fetched_at: now,
        }
    }

    #[test]
    fn test_dbscan_two_groups_and_noise() {
        let points: Vec<Vec<f32>> = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.05, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.05, 0.98, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let labels = dbscan(&points, 0.3, 2);
        assert_eq!(labels, vec![0, 0, 1, 1, NOISE]);
    }

    #[test]
    fn test_dbscan_min_samples_counts_self() {
        let points: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        // Each point is its own neighbour, so min_samples = 1 yields singletons
        assert_eq!(dbscan(&points, 0.1, 1), vec![0, 1]);
        assert_eq!(dbscan(&points, 0.1, 2), vec![NOISE, NOISE]);
    }

    #[test]
    fn test_dbscan_border_point_joins_cluster() {
        // b is within eps of a and c, a and c are not within eps of each other
        let a: Vec<f32> = vec![1.0, 0.0];
        let b: Vec<f32> = vec![0.8, 0.6];
        let c: Vec<f32> = vec![0.28, 0.96];
        let labels = dbscan(&[a, b, c], 0.25, 3);
        // Only b has three neighbours; a and c join as border points
        assert_eq!(labels, vec![0, 0, 0]);
    }

    #[test]
    fn test_cluster_articles_skips_missing_embeddings() {
        let articles: Vec<Article> = ["https://a", "https://b", "https://c", "https://d"]
            .into_iter()
            .map(article)
            .collect();
        let embeddings: HashMap<String, EmbeddingVector> = [
            ("https://a".to_string(), vec![1.0, 0.0]),
            ("https://b".to_string(), vec![0.98, 0.02]),
            ("https://c".to_string(), vec![0.0, 1.0]),
        ]
        .into_iter()
        .collect();

        let result = cluster_articles(&articles, &embeddings, 0.3, 2);

        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].article_count, 2);
        assert_eq!(result.noise_count, 1);
        assert_eq!(result.assignments.len(), 3);
        assert_eq!(result.assignments["https://a"].cluster_size, 2);
        assert_eq!(result.assignments["https://c"].cluster_id, NOISE);
        assert!(!result.assignments.contains_key("https://d"));

        let rebuilt = clusters_from_assignments(&articles, &result.assignments);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].articles[0].url, "https://a");
    }

    #[test]
    fn test_find_related_excludes_target() {
        let embeddings: HashMap<String, EmbeddingVector> = [
            ("https://a".to_string(), vec![1.0, 0.0]),
            ("https://b".to_string(), vec![0.9, 0.1]),
            ("https://c".to_string(), vec![0.0, 1.0]),
        ]
        .into_iter()
        .collect();

        let related = find_related("https://a", &embeddings, 3, 0.4);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].url, "https://b");

        assert!(find_related("https://missing", &embeddings, 3, 0.4).is_empty());
    }

    #[test]
    fn test_similar_pair_share() {
        let same: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        // 1 of 3 pairs is similar
        assert!((similar_pair_share(&same, 0.7) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(similar_pair_share(&same[..1], 0.7), 0.0);
    }
}
