//! Headline source abstraction polled by the scheduler

use async_trait::async_trait;
use pulse_core::Article;

use crate::error::NewsError;

/// Anything that can deliver a batch of current headlines for a locale
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn fetch_headlines(
        &self,
        country: &str,
        language: &str,
    ) -> Result<Vec<Article>, NewsError>;
}

/// Source used when no upstream credentials are configured.
///
/// Every fetch fails, so poll cycles still run retention and signal steps
/// over whatever is already stored.
#[derive(Debug, Default)]
pub struct DisabledSource;

#[async_trait]
impl HeadlineSource for DisabledSource {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn fetch_headlines(
        &self,
        _country: &str,
        _language: &str,
    ) -> Result<Vec<Article>, NewsError> {
        Err(NewsError::InvalidConfig(
            "NEWS_API_KEY is not set; headline fetching is disabled".to_string(),
        ))
    }
}
