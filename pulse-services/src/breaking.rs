//! Breaking-News Scorer
//!
//! Compares the last hour of headlines against the twelve hours before it
//! with three sub-scores:
//! - volume: how far the recent article rate exceeds the baseline rate
//! - novelty: weighted count of entities that appear only in the recent window
//! - clustering: share of recent article pairs that read like the same story
//!
//! The combined score is `round(0.40 * volume + 0.35 * novelty + 0.25 * clustering)`.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use pulse_core::{
    Article, BreakingAssessment, BreakingSignals, EntityType, PulseError, PulseResult,
};
use pulse_embedding::{centroid, cosine_similarity, EmbeddingVector};
use tracing::{debug, info, instrument};

use crate::article_store::ArticleStore;
use crate::clustering::similar_pair_share;
use crate::config::{
    BASELINE_WINDOW_HOURS, BREAKING_PAIR_SIMILARITY, MIN_RECENT_FOR_BREAKING, RECENT_WINDOW_HOURS,
};
use crate::entities::{extract_from_articles, names_of, EntityExtractor, EntityRanking};

const VOLUME_WEIGHT: f64 = 0.40;
const NOVELTY_WEIGHT: f64 = 0.35;
const CLUSTERING_WEIGHT: f64 = 0.25;

/// Novelty points per weighted entity
const NOVELTY_SCALE: f64 = 3.3;
const MAX_NOVEL_ENTITIES: usize = 10;
const MAX_RELATED_URLS: usize = 5;

/// Volume sub-score from article counts in both windows
///
/// Against an empty baseline every recent article is worth 20 points. Otherwise
/// the spike ratio against the baseline hourly average maps linearly so that
/// 1x is 0, 3x is 50 and 5x or more is 100.
pub fn volume_score(recent_count: usize, baseline_count: usize) -> f64 {
    if baseline_count == 0 {
        return (recent_count as f64 * 20.0).min(100.0);
    }

    let baseline_avg_per_hour = baseline_count as f64 / BASELINE_WINDOW_HOURS as f64;
    let spike_ratio = recent_count as f64 / baseline_avg_per_hour;
    ((spike_ratio - 1.0) * 25.0).clamp(0.0, 100.0)
}

/// Novelty sub-score and the first novel entity names
///
/// A name is novel when it appears in the recent ranking for a type but not
/// in the baseline ranking for the same type. Types without a weight
/// (PRODUCT) do not count.
pub fn novelty_score(recent: &EntityRanking, baseline: &EntityRanking) -> (f64, Vec<String>) {
    let mut total = 0u32;
    let mut novel = Vec::new();

    for entity_type in EntityType::ALL {
        let Some(weight) = entity_type.novelty_weight() else {
            continue;
        };
        let known = names_of(baseline, entity_type);
        let mut fresh: Vec<&str> = names_of(recent, entity_type)
            .into_iter()
            .filter(|name| !known.contains(name))
            .collect();
        fresh.sort_unstable();

        total += weight * fresh.len() as u32;
        novel.extend(fresh.into_iter().map(String::from));
    }

    novel.truncate(MAX_NOVEL_ENTITIES);
    ((total as f64 * NOVELTY_SCALE).min(100.0), novel)
}

/// Clustering sub-score: percentage of recent pairs at or above the pair threshold
pub fn clustering_score<V: AsRef<[f32]>>(recent_embeddings: &[V]) -> f64 {
    similar_pair_share(recent_embeddings, BREAKING_PAIR_SIMILARITY) * 100.0
}

/// Weighted, rounded combination of the three sub-scores
pub fn combined_score(signals: &BreakingSignals) -> u8 {
    let raw = signals.volume * VOLUME_WEIGHT
        + signals.novelty * NOVELTY_WEIGHT
        + signals.clustering * CLUSTERING_WEIGHT;
    raw.round().clamp(0.0, 100.0) as u8
}

/// Index of the embedding closest to the centroid of the set
///
/// A single embedding is its own representative. Ties go to the lowest index.
pub fn select_representative(embeddings: &[&[f32]]) -> Option<usize> {
    match embeddings.len() {
        0 => None,
        1 => Some(0),
        _ => {
            let center = centroid(embeddings)?;
            let mut best: Option<(usize, f64)> = None;
            for (i, embedding) in embeddings.iter().enumerate() {
                let similarity = cosine_similarity(embedding, &center);
                match best {
                    Some((_, s)) if similarity <= s => {}
                    _ => best = Some((i, similarity)),
                }
            }
            best.map(|(i, _)| i)
        }
    }
}

/// Recent and baseline windows on `published_at`
#[derive(Debug, Clone, Copy)]
pub struct BreakingWindows {
    pub baseline_start: DateTime<Utc>,
    pub recent_start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BreakingWindows {
    /// Recent `[now-1h, now)`, baseline `[now-13h, now-1h)`
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        let recent_start = now - Duration::hours(RECENT_WINDOW_HOURS);
        Self {
            baseline_start: recent_start - Duration::hours(BASELINE_WINDOW_HOURS),
            recent_start,
            end: now,
        }
    }
}

/// Scores the recent window against the baseline
pub struct BreakingScorer<'a> {
    entities: &'a dyn EntityExtractor,
    threshold: u8,
}

impl<'a> BreakingScorer<'a> {
    pub fn new(entities: &'a dyn EntityExtractor, threshold: u8) -> Self {
        Self {
            entities,
            threshold,
        }
    }

    /// Load both windows from the store and assess them
    #[instrument(skip(self, store, embeddings))]
    pub fn assess_at(
        &self,
        store: &ArticleStore,
        embeddings: &HashMap<String, EmbeddingVector>,
        now: DateTime<Utc>,
    ) -> PulseResult<BreakingAssessment> {
        let windows = BreakingWindows::ending_at(now);
        let recent = store.articles_published_between(windows.recent_start, windows.end)?;
        let baseline = store.articles_published_between(windows.baseline_start, windows.recent_start)?;
        self.assess(&recent, &baseline, embeddings, now)
    }

    /// Assess pre-loaded windows; `recent` is expected newest first
    ///
    /// Recent articles without an embedding are left out of the clustering
    /// sub-score and representative selection.
    pub fn assess(
        &self,
        recent: &[Article],
        baseline: &[Article],
        embeddings: &HashMap<String, EmbeddingVector>,
        now: DateTime<Utc>,
    ) -> PulseResult<BreakingAssessment> {
        if recent.len() < MIN_RECENT_FOR_BREAKING {
            return Err(PulseError::insufficient(MIN_RECENT_FOR_BREAKING, recent.len()));
        }

        let volume = volume_score(recent.len(), baseline.len());

        let recent_entities = extract_from_articles(self.entities, recent);
        let baseline_entities = extract_from_articles(self.entities, baseline);
        let (novelty, novel_entities) = novelty_score(&recent_entities, &baseline_entities);

        let embedded: Vec<(&Article, &[f32])> = recent
            .iter()
            .filter_map(|a| embeddings.get(&a.url).map(|e| (a, e.as_slice())))
            .collect();
        let vectors: Vec<&[f32]> = embedded.iter().map(|(_, e)| *e).collect();
        let clustering = clustering_score(&vectors);

        let representative = match select_representative(&vectors) {
            Some(i) => embedded[i].0,
            None => recent
                .first()
                .ok_or_else(|| PulseError::internal("recent window is empty"))?,
        };

        let signals = BreakingSignals {
            volume,
            novelty,
            clustering,
        };
        let score = combined_score(&signals);
        let is_breaking = score >= self.threshold;

        debug!(
            "Breaking signals: volume={:.1} novelty={:.1} clustering={:.1} -> {}",
            volume, novelty, clustering, score
        );
        if is_breaking {
            info!(
                "Breaking story detected (score {}): {}",
                score, representative.title
            );
        }

        Ok(BreakingAssessment {
            score,
            signals,
            recent_count: recent.len(),
            baseline_count: baseline.len(),
            representative: representative.to_ref(),
            related_urls: recent
                .iter()
                .take(MAX_RELATED_URLS)
                .map(|a| a.url.clone())
                .collect(),
            novel_entities,
            is_breaking,
            detected_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityCount, EntityMention};
    use std::collections::BTreeMap;

    /// Treats every capitalised word as a PERSON
    struct CapitalisedAsPerson;

    impl EntityExtractor for CapitalisedAsPerson {
        fn extract_entities(&self, text: &str) -> Vec<EntityMention> {
            text.split_whitespace()
                .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
                .map(|w| EntityMention {
                    text: w.to_string(),
                    entity_type: EntityType::Person,
                })
                .collect()
        }
    }

    fn article(url: &str, title: &str, minutes_ago: i64, now: DateTime<Utc>) -> Article {
        Article {
            url: url.to_string(),
            title: title.to_string(),
            description: None,
            content: None,
            source_name: "Wire".to_string(),
            published_at: now - Duration::minutes(minutes_ago),
            fetched_at: now,
        }
    }

    fn ranking(entries: &[(EntityType, &str)]) -> EntityRanking {
        let mut ranking: EntityRanking = BTreeMap::new();
        for (entity_type, name) in entries {
            ranking.entry(*entity_type).or_default().push(EntityCount {
                name: name.to_string(),
                count: 1,
            });
        }
        ranking
    }

    #[test]
    fn test_volume_against_silence() {
        assert_eq!(volume_score(5, 0), 100.0);
        assert_eq!(volume_score(2, 0), 40.0);
        assert_eq!(volume_score(0, 0), 0.0);
    }

    #[test]
    fn test_volume_spike_ratio() {
        // 60 over 12h is 5/h; 25 recent is a 5x spike
        assert_eq!(volume_score(25, 60), 100.0);
        // 24 over 12h is 2/h; 6 recent is a 3x spike
        assert_eq!(volume_score(6, 24), 50.0);
        assert_eq!(volume_score(5, 24), 37.5);
        // At or below the baseline rate
        assert_eq!(volume_score(2, 24), 0.0);
        assert_eq!(volume_score(0, 24), 0.0);
    }

    #[test]
    fn test_volume_is_monotonic_in_recent_count() {
        for baseline in [0usize, 1, 12, 60, 500] {
            let mut last = 0.0;
            for recent in 0..200 {
                let score = volume_score(recent, baseline);
                assert!(score >= last, "baseline {} recent {}", baseline, recent);
                assert!((0.0..=100.0).contains(&score));
                last = score;
            }
        }
    }

    #[test]
    fn test_combined_score_formula() {
        let steps = [0.0, 12.5, 33.3, 50.0, 66.6, 99.9, 100.0];
        for &volume in &steps {
            for &novelty in &steps {
                for &clustering in &steps {
                    let signals = BreakingSignals {
                        volume,
                        novelty,
                        clustering,
                    };
                    let expected = (0.40 * volume + 0.35 * novelty + 0.25 * clustering).round() as u8;
                    assert_eq!(combined_score(&signals), expected);
                }
            }
        }
        let max = BreakingSignals {
            volume: 100.0,
            novelty: 100.0,
            clustering: 100.0,
        };
        assert_eq!(combined_score(&max), 100);
    }

    #[test]
    fn test_novelty_weights_and_product_exclusion() {
        let recent = ranking(&[
            (EntityType::Person, "Jane Doe"),
            (EntityType::Event, "World Cup"),
            (EntityType::Gpe, "Kyiv"),
            (EntityType::Product, "iPhone"),
        ]);
        let baseline = ranking(&[(EntityType::Gpe, "Kyiv")]);

        let (score, names) = novelty_score(&recent, &baseline);

        // PERSON 3 + EVENT 4 = 7 -> 23.1
        assert!((score - 23.1).abs() < 1e-9);
        assert_eq!(names, vec!["Jane Doe".to_string(), "World Cup".to_string()]);
    }

    #[test]
    fn test_novelty_caps_score_and_names() {
        let events: Vec<(EntityType, String)> = (0..12)
            .map(|i| (EntityType::Event, format!("Event {:02}", i)))
            .collect();
        let entries: Vec<(EntityType, &str)> =
            events.iter().map(|(t, n)| (*t, n.as_str())).collect();

        let (score, names) = novelty_score(&ranking(&entries), &EntityRanking::new());

        assert_eq!(score, 100.0);
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "Event 00");
    }

    #[test]
    fn test_representative_is_closest_to_centroid() {
        let a = [1.0f32, 0.0];
        let b = [0.7f32, 0.7];
        let c = [0.0f32, 1.0];
        assert_eq!(select_representative(&[&a[..], &b[..], &c[..]]), Some(1));
        assert_eq!(select_representative(&[&c[..]]), Some(0));
        assert_eq!(select_representative(&[]), None);
    }

    #[test]
    fn test_assess_requires_three_recent_articles() {
        let now = Utc::now();
        let extractor = CapitalisedAsPerson;
        let scorer = BreakingScorer::new(&extractor, 60);
        let recent = vec![article("https://a", "one", 5, now), article("https://b", "two", 10, now)];

        let err = scorer.assess(&recent, &[], &HashMap::new(), now).unwrap_err();
        assert_eq!(err.code(), "insufficient_data");
    }

    #[test]
    fn test_assess_burst_against_quiet_baseline() {
        let now = Utc::now();
        let extractor = CapitalisedAsPerson;
        let scorer = BreakingScorer::new(&extractor, 60);

        let recent: Vec<Article> = (0..6)
            .map(|i| article(&format!("https://burst/{}", i), "explosion at Harbor", i * 5, now))
            .collect();
        let baseline = vec![article("https://old", "quiet day", 300, now)];
        let embeddings: HashMap<String, EmbeddingVector> = recent
            .iter()
            .map(|a| (a.url.clone(), vec![1.0, 0.0]))
            .collect();

        let assessment = scorer.assess(&recent, &baseline, &embeddings, now).unwrap();

        // 6 recent vs 1/12 per hour saturates volume
        assert_eq!(assessment.signals.volume, 100.0);
        assert!((assessment.signals.novelty - 9.9).abs() < 1e-9);
        assert_eq!(assessment.signals.clustering, 100.0);
        // 40 + 3.465 + 25 = 68.465
        assert_eq!(assessment.score, 68);
        assert!(assessment.is_breaking);
        assert_eq!(assessment.recent_count, 6);
        assert_eq!(assessment.baseline_count, 1);
        assert_eq!(assessment.related_urls.len(), 5);
        assert_eq!(assessment.related_urls[0], "https://burst/0");
        assert_eq!(assessment.novel_entities, vec!["Harbor".to_string()]);
        assert_eq!(assessment.representative.url, "https://burst/0");
        assert_eq!(assessment.detected_at, now);
    }

    #[test]
    fn test_assess_from_store_windows() {
        let now = Utc::now();
        let store = ArticleStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
            .upsert_articles(&[
                article("https://r1", "Recent one", 10, now),
                article("https://r2", "Recent two", 20, now),
                article("https://r3", "Recent three", 59, now),
                article("https://b1", "Baseline", 61, now),
                article("https://b2", "Baseline", 12 * 60 + 59, now),
                article("https://too-old", "Ancient", 13 * 60 + 1, now),
            ])
            .unwrap();

        let extractor = CapitalisedAsPerson;
        let assessment = BreakingScorer::new(&extractor, 90)
            .assess_at(&store, &HashMap::new(), now)
            .unwrap();

        assert_eq!(assessment.recent_count, 3);
        assert_eq!(assessment.baseline_count, 2);
        // No embeddings: no clustering, newest recent article represents
        assert_eq!(assessment.signals.clustering, 0.0);
        assert_eq!(assessment.representative.url, "https://r1");
        assert!(!assessment.is_breaking);
    }
}
