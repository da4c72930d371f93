//! Keyword trend records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ranked keyword trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    pub keyword: String,
    pub current_count: u32,
    pub previous_count: u32,
    /// `None` marks a new/emerging keyword (no occurrences in the previous window)
    pub growth: Option<f64>,
}

impl TrendItem {
    pub fn new(keyword: impl Into<String>, current_count: u32, previous_count: u32) -> Self {
        Self {
            keyword: keyword.into(),
            current_count,
            previous_count,
            growth: compute_growth(current_count, previous_count),
        }
    }

    pub fn is_new(&self) -> bool {
        self.previous_count == 0
    }
}

/// (current − previous) / previous, undefined when previous is zero
pub fn compute_growth(current_count: u32, previous_count: u32) -> Option<f64> {
    if previous_count == 0 {
        return None;
    }
    Some((current_count as f64 - previous_count as f64) / previous_count as f64)
}

/// Window metadata returned alongside a trend ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendMeta {
    pub country: String,
    pub language: String,
    pub window_hours: i64,
    pub split_hours: i64,
    pub retention_hours: i64,
    pub window_start: DateTime<Utc>,
    pub split_at: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

/// Trend ranking response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub meta: TrendMeta,
    pub trending: Vec<TrendEntry>,
}

/// Wire form of a trend item, with the derived `isNew` flag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    pub keyword: String,
    pub current_count: u32,
    pub previous_count: u32,
    pub growth: Option<f64>,
    pub is_new: bool,
}

impl From<TrendItem> for TrendEntry {
    fn from(item: TrendItem) -> Self {
        let is_new = item.is_new();
        Self {
            keyword: item.keyword,
            current_count: item.current_count,
            previous_count: item.previous_count,
            growth: item.growth,
            is_new,
        }
    }
}
