//! Trend Ranker
//!
//! Compares keyword counts of the previous 12h window against the current
//! 12h window. Keywords absent from the previous window (Group A) always rank
//! above keywords that were already present (Group B).

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use pulse_core::{PulseResult, TrendEntry, TrendItem, TrendMeta, TrendReport};
use tracing::{debug, instrument};

use crate::article_store::ArticleStore;
use crate::config::{PulseConfig, TREND_SPLIT_HOURS, TREND_WINDOW_HOURS};
use crate::keywords::{count_keywords, KeywordExtractor};

/// Rank keyword trends from two count snapshots
///
/// Group A (previous == 0) is ordered by (current_count, keyword) descending,
/// Group B by (growth, current_count, keyword) descending. The result is
/// A followed by B, truncated to `limit`.
pub fn rank_trends(
    current: &HashMap<String, u32>,
    previous: &HashMap<String, u32>,
    limit: usize,
) -> Vec<TrendItem> {
    let (mut group_a, mut group_b): (Vec<TrendItem>, Vec<TrendItem>) = current
        .iter()
        .map(|(keyword, &count)| {
            let prev = previous.get(keyword).copied().unwrap_or(0);
            TrendItem::new(keyword.clone(), count, prev)
        })
        .partition(|item| item.previous_count == 0);

    group_a.sort_by(|a, b| {
        b.current_count
            .cmp(&a.current_count)
            .then_with(|| b.keyword.cmp(&a.keyword))
    });

    group_b.sort_by(|a, b| {
        let growth_a = a.growth.unwrap_or(f64::NEG_INFINITY);
        let growth_b = b.growth.unwrap_or(f64::NEG_INFINITY);
        growth_b
            .partial_cmp(&growth_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.current_count.cmp(&a.current_count))
            .then_with(|| b.keyword.cmp(&a.keyword))
    });

    group_a.extend(group_b);
    group_a.truncate(limit);
    group_a
}

/// Window boundaries for one trend computation
#[derive(Debug, Clone, Copy)]
pub struct TrendWindows {
    pub window_start: DateTime<Utc>,
    pub split_at: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl TrendWindows {
    /// 24h ending at `now`, split 12h before `now`
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            window_start: now - Duration::hours(TREND_WINDOW_HOURS),
            split_at: now - Duration::hours(TREND_SPLIT_HOURS),
            window_end: now,
        }
    }
}

/// Compute the trend report from stored titles at `now`
#[instrument(skip(store, extractor, config))]
pub fn compute_trends(
    store: &ArticleStore,
    extractor: &dyn KeywordExtractor,
    config: &PulseConfig,
    now: DateTime<Utc>,
    limit: usize,
) -> PulseResult<TrendReport> {
    let windows = TrendWindows::ending_at(now);

    let previous_titles: Vec<String> = store
        .articles_published_between(windows.window_start, windows.split_at)?
        .into_iter()
        .map(|a| a.title)
        .filter(|t| !t.trim().is_empty())
        .collect();
    let current_titles: Vec<String> = store
        .articles_published_between(windows.split_at, windows.window_end)?
        .into_iter()
        .map(|a| a.title)
        .filter(|t| !t.trim().is_empty())
        .collect();

    let previous = count_keywords(extractor, &previous_titles);
    let current = count_keywords(extractor, &current_titles);

    debug!(
        "Trend windows: {} previous titles ({} keywords), {} current titles ({} keywords)",
        previous_titles.len(),
        previous.len(),
        current_titles.len(),
        current.len()
    );

    let ranked = rank_trends(current.as_map(), previous.as_map(), limit);

    Ok(TrendReport {
        meta: TrendMeta {
            country: config.poll_country.clone(),
            language: config.poll_language.clone(),
            window_hours: TREND_WINDOW_HOURS,
            split_hours: TREND_SPLIT_HOURS,
            retention_hours: config.retention_hours,
            window_start: windows.window_start,
            split_at: windows.split_at,
            window_end: windows.window_end,
            fetched_at: now,
        },
        trending: ranked.into_iter().map(TrendEntry::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::PhraseExtractor;
    use pulse_core::Article;

    fn counts(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn keywords(items: &[TrendItem]) -> Vec<&str> {
        items.iter().map(|i| i.keyword.as_str()).collect()
    }

    #[test]
    fn test_all_new_keywords_rank_by_count() {
        let ranked = rank_trends(&counts(&[("a", 1), ("b", 5), ("c", 2)]), &HashMap::new(), 50);
        assert_eq!(keywords(&ranked), vec!["b", "c", "a"]);
        assert!(ranked.iter().all(|i| i.growth.is_none()));
    }

    #[test]
    fn test_existing_keywords_rank_by_growth() {
        let ranked = rank_trends(
            &counts(&[("x", 10), ("y", 10)]),
            &counts(&[("x", 5), ("y", 2)]),
            50,
        );
        assert_eq!(keywords(&ranked), vec!["y", "x"]);
        assert_eq!(ranked[0].growth, Some(4.0));
        assert_eq!(ranked[1].growth, Some(1.0));
    }

    #[test]
    fn test_new_keywords_always_above_existing() {
        let ranked = rank_trends(
            &counts(&[("tiny-new", 1), ("huge-growth", 500)]),
            &counts(&[("huge-growth", 1)]),
            50,
        );
        assert_eq!(keywords(&ranked), vec!["tiny-new", "huge-growth"]);

        let first_existing = ranked.iter().position(|i| i.previous_count > 0).unwrap();
        assert!(ranked[..first_existing].iter().all(|i| i.previous_count == 0));
        assert!(ranked[first_existing..].iter().all(|i| i.previous_count > 0));
    }

    #[test]
    fn test_ties_break_on_keyword_descending() {
        let ranked = rank_trends(&counts(&[("apple", 3), ("banana", 3)]), &HashMap::new(), 50);
        assert_eq!(keywords(&ranked), vec!["banana", "apple"]);

        let ranked = rank_trends(
            &counts(&[("apple", 4), ("banana", 4), ("cherry", 6)]),
            &counts(&[("apple", 2), ("banana", 2), ("cherry", 3)]),
            50,
        );
        // Equal growth (1.0): higher count first, then keyword desc
        assert_eq!(keywords(&ranked), vec!["cherry", "banana", "apple"]);
    }

    #[test]
    fn test_limit_truncates_after_grouping() {
        let ranked = rank_trends(
            &counts(&[("a", 1), ("b", 2), ("c", 3)]),
            &counts(&[("c", 1)]),
            2,
        );
        assert_eq!(keywords(&ranked), vec!["b", "a"]);
        assert!(rank_trends(&counts(&[("a", 1)]), &HashMap::new(), 0).is_empty());
    }

    #[test]
    fn test_keywords_only_in_previous_are_ignored() {
        let ranked = rank_trends(&counts(&[("a", 1)]), &counts(&[("gone", 9)]), 50);
        assert_eq!(keywords(&ranked), vec!["a"]);
    }

    #[test]
    fn test_compute_trends_from_store() {
        let store = ArticleStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        let now = Utc::now();

        let headline = |url: &str, title: &str, hours_ago: i64| Article {
            url: url.to_string(),
            title: title.to_string(),
            description: None,
            content: None,
            source_name: "Wire".to_string(),
            published_at: now - Duration::hours(hours_ago),
            fetched_at: now,
        };

        store
            .upsert_articles(&[
                headline("https://p1", "Budget talks stall", 20),
                headline("https://c1", "Budget talks resume", 2),
                headline("https://c2", "Wildfire spreads", 3),
                headline("https://c3", "Wildfire spreads", 4),
                headline("https://old", "Outside window", 30),
            ])
            .unwrap();

        let config = PulseConfig::default();
        let report = compute_trends(&store, &PhraseExtractor::new(), &config, now, 50).unwrap();

        assert_eq!(report.meta.window_hours, 24);
        assert_eq!(report.meta.split_hours, 12);
        assert_eq!(report.meta.retention_hours, 48);
        assert_eq!(report.meta.country, "us");

        let ranked: Vec<&str> = report.trending.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(ranked, vec!["wildfire spread", "budget talk resume"]);
        assert!(report.trending.iter().all(|t| t.is_new));
    }
}
